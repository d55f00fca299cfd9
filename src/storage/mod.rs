//! Storage Layer
//!
//! Handles all data persistence: the SQLite session store and JSON config.

pub mod config;
pub mod database;
pub mod session_store;

pub use config::*;
pub use database::*;
pub use session_store::*;
