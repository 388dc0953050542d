//! crates/studyflow_core/src/error.rs
//!
//! The error type for the client-side study flows.

use crate::ports::{PortError, StoreError};
use crate::quiz::QuizError;

#[derive(Debug, thiserror::Error)]
pub enum StudyError {
    /// An error that propagated up from the backend port.
    #[error(transparent)]
    Port(#[from] PortError),

    /// A local storage write failed.
    #[error("Local storage error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Quiz(#[from] QuizError),
}

impl StudyError {
    /// Whether the failure was caught locally, before any network call.
    pub fn is_validation(&self) -> bool {
        matches!(self, StudyError::Port(PortError::Validation(_)) | StudyError::Quiz(_))
    }
}

pub type StudyResult<T> = Result<T, StudyError>;
