//! Audit Workbench - Workflow Session Engine
//!
//! Core engine behind the audit-management dashboard:
//! - Scoping and execution session managers with durable history
//! - A staged analysis pipeline calling the external audit agent
//! - SQLite-backed session store with one namespace per session kind
//! - Report aggregation over stored execution sessions

pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

pub use models::settings::{EngineConfig, SettingsUpdate};
pub use services::{
    AgentClient, ExecutionManager, HttpAgentClient, PipelineStage, RunOutcome, ScopingManager,
};
pub use storage::{Database, SessionStore};
pub use utils::error::{AppError, AppResult};
