//! Cross-Platform Path Utilities
//!
//! Functions for resolving application directories across platforms.
//! Everything lives under ~/.audit-workbench/.

use std::path::PathBuf;

use crate::utils::error::{AppError, AppResult};

/// Get the user's home directory
pub fn home_dir() -> AppResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| AppError::config("Could not determine home directory"))
}

/// Get the Audit Workbench directory (~/.audit-workbench/)
pub fn workbench_dir() -> AppResult<PathBuf> {
    Ok(home_dir()?.join(".audit-workbench"))
}

/// Get the config file path (~/.audit-workbench/config.json)
pub fn config_path() -> AppResult<PathBuf> {
    Ok(workbench_dir()?.join("config.json"))
}

/// Get the database file path (~/.audit-workbench/sessions.db)
pub fn database_path() -> AppResult<PathBuf> {
    Ok(workbench_dir()?.join("sessions.db"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &PathBuf) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Get the Audit Workbench directory, creating if it doesn't exist
pub fn ensure_workbench_dir() -> AppResult<PathBuf> {
    let path = workbench_dir()?;
    ensure_dir(&path)?;
    Ok(path)
}
