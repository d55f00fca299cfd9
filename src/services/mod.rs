//! Services
//!
//! Business logic for the audit workflow engine: the agent boundary, the
//! shared analysis pipeline, the two session managers, and report
//! aggregation.

pub mod agent;
pub mod execution;
pub mod pipeline;
pub mod reports;
pub mod scoping;

pub use agent::{AgentClient, AgentReply, AgentRequest, HttpAgentClient, SupervisorConfig};
pub use execution::ExecutionManager;
pub use pipeline::{PacingConfig, Pipeline, PipelineStage, RunOutcome};
pub use reports::{all_reports, baseline_reports, generate_reports};
pub use scoping::ScopingManager;
