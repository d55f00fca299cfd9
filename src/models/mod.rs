//! Data Models
//!
//! Contains all data structures used throughout the engine.

pub mod execution;
pub mod report;
pub mod scoping;
pub mod settings;

pub use execution::*;
pub use report::*;
pub use scoping::*;
pub use settings::*;
