//! Configuration management for audiograb
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use audiograb::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Downloads go to: {}", config.download.dir.display());
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `AUDIOGRAB__<section>__<key>`
//!
//! Examples:
//! - `AUDIOGRAB__DOWNLOAD__POOL_SIZE=8`
//! - `AUDIOGRAB__DOWNLOAD__RETRY_DELAY_MS=2000`
//! - `AUDIOGRAB__ENGINE__BINARY=/opt/yt-dlp/yt-dlp`
//!
//! The bot token is a secret and is only read from `TELEGRAM_BOT_TOKEN`.
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/audiograb.toml`.
//! This can be overridden using the `AUDIOGRAB_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use models::{
    Config, DownloadConfig, EngineConfig, HealthConfig, LoggingConfig, TelegramConfig,
};
pub use validation::ValidationError;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("Failed to render configuration: {0}")]
    RenderError(#[from] toml::ser::Error),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`AUDIOGRAB__*`, `TELEGRAM_BOT_TOKEN`)
    /// 2. TOML file (default: `config/audiograb.toml`)
    /// 3. Default values
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(None)
    }

    /// Load configuration, reading the file at `path` instead of the default location
    pub fn load_with(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config = sources::load(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path without touching `.env` or secrets
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Render the effective configuration as TOML (secrets are skipped)
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        fs::write(&config_path, "[download]\npool_size = 3\n").unwrap();

        let config = Config::load_from_path(config_path).unwrap();
        assert_eq!(config.download.pool_size, 3);
        assert_eq!(config.download.max_attempts, 3);
    }

    #[test]
    fn test_validation_runs_after_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        fs::write(&config_path, "[download]\nmax_attempts = 0\n").unwrap();

        let result = Config::load_from_path(config_path);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ValidationError(ValidationError::NoAttempts)
        ));
    }

    #[test]
    fn test_rendered_config_loads_back() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("rendered.toml");

        let mut config = Config::default();
        config.download.pool_size = 7;
        config.engine.extra_args = vec!["--no-playlist".to_string()];

        fs::write(&config_path, config.to_toml().unwrap()).unwrap();

        let loaded = Config::load_from_path(config_path).unwrap();
        assert_eq!(loaded.download.pool_size, 7);
        assert_eq!(loaded.engine.extra_args, vec!["--no-playlist"]);
    }
}
