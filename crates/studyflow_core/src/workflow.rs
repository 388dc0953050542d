//! crates/studyflow_core/src/workflow.rs
//!
//! The user-level study flows: upload a document, generate and take a quiz,
//! review and save wrong notes, and manage saved sessions.
//!
//! `StudyWorkflow` is constructed once and handed to whatever drives the client.
//! It owns the backend port and the persisted local state, so nothing else
//! touches the storage keys directly.

use std::ops::RangeInclusive;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{error, info};

use crate::context::StudyContext;
use crate::domain::{Payload, QuizData, QuizKind, QuizResult, SavedSession, UploadResult, WrongNote};
use crate::error::{StudyError, StudyResult};
use crate::ports::{
    KeyValueStore, PdfRequest, PortError, SessionBridge, StoreError, UploadRequest, WrongNotePayload,
};
use crate::quiz::QuizRunner;
use crate::wrong_notes::WrongNoteStore;

/// File extensions the backend can extract text from.
pub const ALLOWED_EXTENSIONS: [&str; 2] = ["pdf", "txt"];

/// Number of questions a generated quiz may have.
pub const QUIZ_COUNT_RANGE: RangeInclusive<u32> = 1..=10;

pub struct StudyWorkflow {
    bridge: Arc<dyn SessionBridge>,
    notes: WrongNoteStore,
    context: StudyContext,
    max_upload_bytes: u64,
}

impl StudyWorkflow {
    pub fn new(bridge: Arc<dyn SessionBridge>, storage: Arc<dyn KeyValueStore>, max_upload_bytes: u64) -> Self {
        Self {
            bridge,
            notes: WrongNoteStore::new(storage.clone()),
            context: StudyContext::new(storage),
            max_upload_bytes,
        }
    }

    pub fn notes(&self) -> &WrongNoteStore {
        &self.notes
    }

    pub fn context(&self) -> &StudyContext {
        &self.context
    }

    pub fn bridge(&self) -> &dyn SessionBridge {
        self.bridge.as_ref()
    }

    /// Uploads a document and makes it the current study session.
    ///
    /// Wrong notes from the previous document are discarded.
    pub async fn upload_document(
        &self,
        file_name: &str,
        bytes: Bytes,
        custom_filename: &str,
        category: &str,
    ) -> StudyResult<UploadResult> {
        let custom_filename = custom_filename.trim();
        if custom_filename.is_empty() {
            return Err(PortError::Validation("A name for the document is required".to_string()).into());
        }
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(PortError::Validation(format!(
                "Unsupported file type '{}'; only PDF and TXT files can be uploaded",
                file_name
            ))
            .into());
        }
        if bytes.is_empty() {
            return Err(PortError::Validation(format!("'{}' is empty", file_name)).into());
        }
        if bytes.len() as u64 > self.max_upload_bytes {
            return Err(PortError::Validation(format!(
                "Files larger than {} MB cannot be uploaded",
                self.max_upload_bytes / (1024 * 1024)
            ))
            .into());
        }

        let request = UploadRequest {
            file_name: file_name.to_string(),
            bytes,
            custom_filename: custom_filename.to_string(),
            category: category.to_string(),
        };
        let Payload { typed: result, raw } = self.bridge.upload(request).await.map_err(|e| {
            error!("Failed to upload '{}': {}", file_name, e);
            e
        })?;

        self.notes.clear()?;
        self.context.set_session_id(result.session_id)?;
        self.context.set_summary(&raw)?;
        let quiz = raw.get("quizData").filter(|_| result.quiz_data.is_available());
        self.context.set_quiz(quiz)?;
        self.context.set_quiz_results(&[])?;
        self.context.set_custom_filename(custom_filename)?;
        info!(
            "Uploaded '{}' as '{}' (session {:?})",
            file_name, custom_filename, result.session_id
        );
        Ok(result)
    }

    /// Asks the backend for a fresh quiz over the current document.
    pub async fn generate_quiz(&self, count: u32, kind: QuizKind) -> StudyResult<QuizData> {
        if !QUIZ_COUNT_RANGE.contains(&count) {
            return Err(PortError::Validation(format!(
                "A quiz must have between {} and {} questions",
                QUIZ_COUNT_RANGE.start(),
                QUIZ_COUNT_RANGE.end()
            ))
            .into());
        }
        let summary = self.context.summary().ok_or_else(|| {
            PortError::Validation("Upload a document before generating a quiz".to_string())
        })?;
        let text = summary.quiz_source_text().ok_or_else(|| {
            PortError::Validation("The current document has no text to build a quiz from".to_string())
        })?;

        let Payload { typed: quiz, raw } = self
            .bridge
            .generate_quiz(text, count, kind)
            .await
            .map_err(|e| {
                error!("Quiz generation failed: {}", e);
                e
            })?;
        if quiz.questions.is_empty() {
            return Err(PortError::Decode("the generated quiz has no questions".to_string()).into());
        }

        self.context.set_quiz(Some(&raw))?;
        self.context.set_quiz_results(&[])?;
        info!("Generated a {} quiz with {} questions", kind.as_str(), quiz.questions.len());
        Ok(quiz)
    }

    /// Starts a new attempt over the stored quiz.
    pub fn start_quiz(&self) -> StudyResult<QuizRunner> {
        let quiz = self.context.quiz().ok_or_else(|| {
            PortError::Validation("No quiz is available; generate one first".to_string())
        })?;
        Ok(QuizRunner::new(quiz.questions, self.notes.clone())?)
    }

    /// Keeps the graded results of an attempt, finished or not, for the PDF export.
    pub fn record_attempt(&self, runner: &QuizRunner) -> Result<(), StoreError> {
        self.context.set_quiz_results(runner.results())
    }

    pub fn last_results(&self) -> Vec<QuizResult> {
        self.context.quiz_results()
    }

    pub fn wrong_notes(&self) -> Vec<WrongNote> {
        self.notes.load()
    }

    /// Saves summary, quiz and wrong notes to the backend, then clears the notes.
    pub async fn save_session(&self) -> StudyResult<usize> {
        let session_id = self.context.session_id().ok_or_else(|| {
            PortError::Validation("No study session to save; upload a document first".to_string())
        })?;

        self.notes
            .flush_to_backend(
                self.bridge.as_ref(),
                session_id,
                self.context.summary_value(),
                self.context.quiz_value(),
            )
            .await
            .map_err(|e| {
                error!("Failed to save session {}: {}", session_id, e);
                e
            })
    }

    /// Drops the pending wrong notes and returns the current summary so a new
    /// quiz round can start over the same document.
    pub fn discard_and_restart(&self) -> StudyResult<Option<UploadResult>> {
        self.notes.clear()?;
        info!("Discarded pending wrong notes");
        Ok(self.context.summary())
    }

    pub async fn list_saved(&self) -> StudyResult<Vec<SavedSession>> {
        Ok(self.bridge.list_saved().await?)
    }

    pub async fn delete_saved(&self, id: i64) -> StudyResult<()> {
        self.bridge.delete_saved(id).await.map_err(|e| {
            error!("Failed to delete saved session {}: {}", id, e);
            e
        })?;
        info!("Deleted saved session {}", id);
        Ok(())
    }

    pub async fn saved_session(&self, id: i64) -> StudyResult<SavedSession> {
        self.list_saved()
            .await?
            .into_iter()
            .find(|saved| saved.id == id)
            .ok_or_else(|| StudyError::from(PortError::NotFound(format!("saved session {}", id))))
    }

    /// Renders a PDF from a saved session's summary, quiz and wrong notes.
    pub async fn export_saved_pdf(&self, id: i64) -> StudyResult<(SavedSession, Bytes)> {
        let saved = self.saved_session(id).await?;
        if !saved.has_study_data() {
            return Err(PortError::Validation(format!("Saved session {} has no study data to export", id)).into());
        }
        let request = saved_pdf_request(&saved);
        let pdf = self.bridge.render_pdf(&request).await.map_err(|e| {
            error!("Failed to render PDF for saved session {}: {}", id, e);
            e
        })?;
        info!("Rendered PDF for saved session {} ({} bytes)", id, pdf.len());
        Ok((saved, pdf))
    }

    /// Asks a question about the current document.
    pub async fn ask(&self, question: &str) -> StudyResult<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(PortError::Validation("A question is required".to_string()).into());
        }
        let pdf_text = self
            .context
            .summary()
            .and_then(|s| s.pdf_text)
            .ok_or_else(|| PortError::Validation("Upload a document before asking about it".to_string()))?;
        Ok(self.bridge.chat(question, &pdf_text).await?)
    }

    /// Renders the current summary, the last recorded attempt and the pending
    /// wrong notes to a PDF.
    pub async fn export_pdf(&self) -> StudyResult<Bytes> {
        let summary = self.context.summary();
        let request = PdfRequest {
            summary: self.context.summary_value(),
            keywords: summary.map(|s| s.keyword_list()).unwrap_or_default(),
            quiz_results: self.context.quiz_results(),
            wrong_notes: self.notes.load().iter().map(WrongNotePayload::from).collect(),
        };
        Ok(self.bridge.render_pdf(&request).await?)
    }
}

/// A saved session keeps the quiz but not the answers given, so each question
/// is listed with its answer as an answer key.
fn saved_pdf_request(saved: &SavedSession) -> PdfRequest {
    let quiz_results = saved
        .quiz()
        .into_option()
        .map(|quiz| {
            quiz.questions
                .into_iter()
                .enumerate()
                .map(|(index, q)| QuizResult {
                    index,
                    question: q.question,
                    user_answer: q.answer.clone(),
                    correct_answer: q.answer,
                    is_correct: true,
                    feedback: q.explanation.unwrap_or_default(),
                })
                .collect()
        })
        .unwrap_or_default();

    PdfRequest {
        summary: saved.summary().into_option(),
        keywords: saved.keywords(),
        quiz_results,
        wrong_notes: saved
            .wrong_notes()
            .into_option()
            .unwrap_or_default()
            .iter()
            .map(WrongNotePayload::from)
            .collect(),
    }
}
