//! Engine Settings
//!
//! Configuration for the agent endpoint, pipeline pacing, and storage.

use serde::{Deserialize, Serialize};

/// Engine configuration, persisted as JSON under ~/.audit-workbench/
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Audit agent prediction endpoint
    pub agent_endpoint: String,
    /// Supervisor identity sent with every agent request
    pub supervisor_name: String,
    /// Supervisor system prompt sent with every agent request
    pub supervisor_prompt: String,
    /// Whether the agent should summarize intermediate steps
    pub summarization: bool,
    /// Recursion limit forwarded to the agent runtime
    pub recursion_limit: u32,
    /// Deadline for one agent request, in seconds
    pub request_timeout_secs: u64,
    /// Delay before the "preparing" checkpoint, in milliseconds
    pub prepare_delay_ms: u64,
    /// Delay before the agent call is dispatched, in milliseconds
    pub dispatch_delay_ms: u64,
    /// Delay before the "reviewing" checkpoint, in milliseconds
    pub review_delay_ms: u64,
    /// Delay before synthesis, in milliseconds
    pub synthesize_delay_ms: u64,
    /// Optional database path override; None means the default location
    pub database_path: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            agent_endpoint: "http://localhost:3000/api/v1/prediction/audit-supervisor".into(),
            supervisor_name: "Audit Supervisor".into(),
            supervisor_prompt:
                "You are an audit supervisor coordinating compliance scoping and execution."
                    .into(),
            summarization: true,
            recursion_limit: 15,
            request_timeout_secs: 30,
            prepare_delay_ms: 800,
            dispatch_delay_ms: 1200,
            review_delay_ms: 600,
            synthesize_delay_ms: 800,
            database_path: None,
        }
    }
}

impl EngineConfig {
    /// Check the configuration is usable
    pub fn validate(&self) -> Result<(), String> {
        if self.agent_endpoint.trim().is_empty() {
            return Err("agent endpoint must not be empty".into());
        }
        if self.recursion_limit == 0 {
            return Err("recursion limit must be at least 1".into());
        }
        if self.request_timeout_secs == 0 {
            return Err("request timeout must be at least 1 second".into());
        }
        Ok(())
    }
}

/// Partial update applied over the current configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsUpdate {
    pub agent_endpoint: Option<String>,
    pub supervisor_name: Option<String>,
    pub supervisor_prompt: Option<String>,
    pub summarization: Option<bool>,
    pub recursion_limit: Option<u32>,
    pub request_timeout_secs: Option<u64>,
    pub prepare_delay_ms: Option<u64>,
    pub dispatch_delay_ms: Option<u64>,
    pub review_delay_ms: Option<u64>,
    pub synthesize_delay_ms: Option<u64>,
    /// `Some(None)` clears the override back to the default location
    pub database_path: Option<Option<String>>,
}

impl EngineConfig {
    /// Apply a partial update in place
    pub fn apply_update(&mut self, update: SettingsUpdate) {
        if let Some(v) = update.agent_endpoint {
            self.agent_endpoint = v;
        }
        if let Some(v) = update.supervisor_name {
            self.supervisor_name = v;
        }
        if let Some(v) = update.supervisor_prompt {
            self.supervisor_prompt = v;
        }
        if let Some(v) = update.summarization {
            self.summarization = v;
        }
        if let Some(v) = update.recursion_limit {
            self.recursion_limit = v;
        }
        if let Some(v) = update.request_timeout_secs {
            self.request_timeout_secs = v;
        }
        if let Some(v) = update.prepare_delay_ms {
            self.prepare_delay_ms = v;
        }
        if let Some(v) = update.dispatch_delay_ms {
            self.dispatch_delay_ms = v;
        }
        if let Some(v) = update.review_delay_ms {
            self.review_delay_ms = v;
        }
        if let Some(v) = update.synthesize_delay_ms {
            self.synthesize_delay_ms = v;
        }
        if let Some(v) = update.database_path {
            self.database_path = v;
        }
    }
}
