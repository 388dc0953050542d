//! services/client/src/config.rs
//!
//! Defines the client's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub state_dir: PathBuf,
    pub log_level: Level,
    pub request_timeout: Duration,
    pub max_upload_bytes: u64,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Backend ---
        let api_base_url = lookup("STUDYFLOW_API_URL")
            .ok_or_else(|| ConfigError::MissingVar("STUDYFLOW_API_URL".to_string()))?;
        if !(api_base_url.starts_with("http://") || api_base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue(
                "STUDYFLOW_API_URL".to_string(),
                format!("'{}' is not an http(s) URL", api_base_url),
            ));
        }
        let api_base_url = api_base_url.trim_end_matches('/').to_string();

        let timeout_secs = parse_or(&lookup, "STUDYFLOW_TIMEOUT_SECS", 60u64)?;
        let max_upload_mb = parse_or(&lookup, "STUDYFLOW_MAX_UPLOAD_MB", 50u64)?;
        let max_upload_bytes = max_upload_mb.checked_mul(1024 * 1024).ok_or_else(|| {
            ConfigError::InvalidValue(
                "STUDYFLOW_MAX_UPLOAD_MB".to_string(),
                format!("'{}' is too large", max_upload_mb),
            )
        })?;

        // --- Local state and logging ---
        let state_dir = lookup("STUDYFLOW_STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./.studyflow"));

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            api_base_url,
            state_dir,
            log_level,
            request_timeout: Duration::from_secs(timeout_secs),
            max_upload_bytes,
        })
    }
}

fn parse_or<F>(lookup: &F, name: &str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<u64>().map_err(|e| {
            ConfigError::InvalidValue(name.to_string(), format!("'{}': {}", raw, e))
        }),
    }
}
