//! services/client/src/error.rs
//!
//! Defines the primary error type for the client service.

use crate::config::ConfigError;
use studyflow_core::{PortError, QuizError, StoreError, StudyError};

/// The primary error type for the `client` service.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from the study flows.
    #[error("{0}")]
    Study(#[from] StudyError),

    /// Represents an error from building the HTTP client.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Represents a standard Input/Output error (e.g., reading the upload file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl From<PortError> for CliError {
    fn from(e: PortError) -> Self {
        CliError::Study(e.into())
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        CliError::Study(e.into())
    }
}

impl From<QuizError> for CliError {
    fn from(e: QuizError) -> Self {
        CliError::Study(e.into())
    }
}
