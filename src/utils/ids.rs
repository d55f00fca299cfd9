//! Id Generation Capability
//!
//! Injected id source so session and domain ids are deterministic in tests.

use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier source for sessions, domains, and results
pub trait IdSource: Send + Sync {
    /// Next unique identifier
    fn next_id(&self) -> String;
}

/// Production id source backed by UUID v4
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIdSource;

impl IdSource for UuidIdSource {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Deterministic id source yielding "prefix-1", "prefix-2", ...
#[derive(Debug)]
pub struct SequentialIdSource {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialIdSource {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl IdSource for SequentialIdSource {
    fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{}", self.prefix, n)
    }
}
