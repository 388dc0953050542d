//! crates/studyflow_core/src/ports.rs
//!
//! Defines the service contracts (traits) the client logic depends on.
//! These traits form the boundary of the hexagonal architecture, keeping the
//! core independent of the HTTP client and of the storage medium.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

use crate::domain::{
    Grade, Payload, QuizData, QuizKind, QuizResult, SavedSession, SessionId, UploadResult, WrongNote,
};

//=========================================================================================
// Port Error and Result Types
//=========================================================================================

/// The error type for all backend port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// Rejected locally before any network call was made.
    #[error("{0}")]
    Validation(String),
    /// The backend answered with a non-success status.
    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Network error: {0}")]
    Network(String),
    /// The backend answered, but not with the expected shape.
    #[error("Could not decode backend response: {0}")]
    Decode(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Errors writing to local storage. Read failures never surface; they are
/// treated as empty state by the callers.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to write key '{key}': {message}")]
    Write { key: String, message: String },
    #[error("Failed to encode value for key '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

//=========================================================================================
// Request Payloads
//=========================================================================================

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_name: String,
    pub bytes: Bytes,
    pub custom_filename: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeRequest {
    pub question: String,
    pub user_answer: String,
    pub correct_answer: String,
}

/// The wire form of a wrong note sent on save. Only these fields leave the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WrongNotePayload {
    pub question: String,
    pub user_answer: String,
    pub correct_answer: String,
    pub explanation: Option<String>,
    pub created_at: String,
}

impl From<&WrongNote> for WrongNotePayload {
    fn from(note: &WrongNote) -> Self {
        Self {
            question: note.question.clone(),
            user_answer: note.user_answer.clone(),
            correct_answer: note.correct_answer.clone(),
            explanation: note.explanation.clone(),
            created_at: note.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveSessionRequest {
    pub session_id: SessionId,
    pub summary_data: Option<Value>,
    pub quiz_data: Option<Value>,
    pub wrong_notes: Vec<WrongNotePayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PdfRequest {
    pub summary: Option<Value>,
    pub keywords: Vec<String>,
    pub quiz_results: Vec<QuizResult>,
    pub wrong_notes: Vec<WrongNotePayload>,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The backend HTTP surface. Implementations never retry on their own.
#[async_trait]
pub trait SessionBridge: Send + Sync {
    /// Uploads a document and returns its summary, keywords and initial quiz.
    async fn upload(&self, request: UploadRequest) -> PortResult<Payload<UploadResult>>;

    /// Returns the `quizData` object of the response.
    async fn generate_quiz(&self, text: &str, count: u32, kind: QuizKind) -> PortResult<Payload<QuizData>>;

    /// Grades one answer. Correctness is always decided by the backend.
    async fn grade(&self, request: &GradeRequest) -> PortResult<Grade>;

    /// Answers a free-form question about the uploaded document.
    async fn chat(&self, question: &str, pdf_text: &str) -> PortResult<String>;

    async fn render_pdf(&self, request: &PdfRequest) -> PortResult<Bytes>;

    async fn save_session(&self, request: &SaveSessionRequest) -> PortResult<()>;

    async fn list_saved(&self) -> PortResult<Vec<SavedSession>>;

    async fn delete_saved(&self, id: i64) -> PortResult<()>;
}

/// Durable client-side key/value storage holding JSON text.
pub trait KeyValueStore: Send + Sync {
    /// Returns the raw stored text, or `None` when absent or unreadable.
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    fn remove(&self, key: &str) -> Result<(), StoreError>;
}
