//! JSON Configuration Management
//!
//! Handles reading and writing the engine configuration file.

use std::fs;
use std::path::PathBuf;

use crate::models::settings::{EngineConfig, SettingsUpdate};
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::{config_path, ensure_workbench_dir};

/// Configuration service for managing engine settings
#[derive(Debug)]
pub struct ConfigService {
    config_path: PathBuf,
    config: EngineConfig,
}

impl ConfigService {
    /// Create a new config service, loading existing config or creating defaults
    pub fn new() -> AppResult<Self> {
        ensure_workbench_dir()?;

        let config_path = config_path()?;
        let config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            let default_config = EngineConfig::default();
            Self::save_to_file(&config_path, &default_config)?;
            default_config
        };

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a file
    fn load_from_file(path: &PathBuf) -> AppResult<EngineConfig> {
        let content = fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate().map_err(AppError::config)?;
        Ok(config)
    }

    /// Save configuration to a file with pretty formatting
    fn save_to_file(path: &PathBuf, config: &EngineConfig) -> AppResult<()> {
        config.validate().map_err(AppError::config)?;
        let content = serde_json::to_string_pretty(config)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the current configuration
    pub fn get_config(&self) -> &EngineConfig {
        &self.config
    }

    /// Update the configuration with a partial update
    pub fn update_config(&mut self, update: SettingsUpdate) -> AppResult<EngineConfig> {
        self.config.apply_update(update);
        self.save()?;
        Ok(self.config.clone())
    }

    /// Save the current configuration to disk
    pub fn save(&self) -> AppResult<()> {
        Self::save_to_file(&self.config_path, &self.config)
    }

    /// Reload configuration from disk
    pub fn reload(&mut self) -> AppResult<()> {
        self.config = Self::load_from_file(&self.config_path)?;
        Ok(())
    }

    /// Check if the config service is healthy
    pub fn is_healthy(&self) -> bool {
        self.config_path.exists() && self.config.validate().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_at(dir: &tempfile::TempDir) -> ConfigService {
        let path = dir.path().join("config.json");
        let config = EngineConfig::default();
        ConfigService::save_to_file(&path, &config).unwrap();
        ConfigService {
            config_path: path,
            config,
        }
    }

    #[test]
    fn test_save_and_load_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = EngineConfig::default();

        ConfigService::save_to_file(&path, &config).unwrap();
        assert!(path.exists());

        let loaded = ConfigService::load_from_file(&path).unwrap();
        assert_eq!(loaded.agent_endpoint, config.agent_endpoint);
        assert_eq!(loaded.recursion_limit, config.recursion_limit);
    }

    #[test]
    fn test_invalid_config_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"agentEndpoint": ""}"#).unwrap();

        assert!(ConfigService::load_from_file(&path).is_err());
    }

    #[test]
    fn test_update_config_persists() {
        let dir = tempfile::tempdir().unwrap();
        let mut service = service_at(&dir);

        let updated = service
            .update_config(SettingsUpdate {
                supervisor_name: Some("Lead Auditor".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(updated.supervisor_name, "Lead Auditor");

        service.reload().unwrap();
        assert_eq!(service.get_config().supervisor_name, "Lead Auditor");
    }
}
