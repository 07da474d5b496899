//! Configuration management for hookrelay
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `HOOKRELAY__<section>__<key>`
//!
//! Examples:
//! - `HOOKRELAY__SERVER__BIND_ADDR=0.0.0.0:9000`
//! - `HOOKRELAY__ALERTS__ALERT_ON_UNKNOWN_WEBHOOK=false`
//!
//! Notification secrets are only read from `SLACK_BOT_TOKEN`,
//! `SLACK_CHANNEL_ID` and `SLACK_WEBHOOK_URL`.
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/hookrelay.toml`.
//! This can be overridden using the `HOOKRELAY_CONFIG` environment variable
//! or the `--config` CLI flag.

mod models;
mod sources;
mod validation;

pub use models::{AlertsConfig, Config, NotifierConfig, ServerConfig};
pub use validation::ValidationError;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// `path` takes precedence over `HOOKRELAY_CONFIG` and the default path.
    pub fn load(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config = sources::load(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path, without secrets
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
