//! crates/studyflow_core/src/testing.rs
//!
//! Test doubles shared by the unit tests in this crate.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::{
    Grade, Payload, QuizData, QuizKind, QuizQuestion, QuestionId, SavedSession, UploadResult, WrongNote,
};
use crate::ports::{
    GradeRequest, PdfRequest, PortError, PortResult, SaveSessionRequest, SessionBridge, UploadRequest,
};

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

pub fn note(question: &str, user_answer: &str, correct_answer: &str, offset_secs: i64) -> WrongNote {
    WrongNote {
        question: question.to_string(),
        user_answer: user_answer.to_string(),
        correct_answer: correct_answer.to_string(),
        explanation: Some(format!("The answer is {}", correct_answer)),
        created_at: base_time() + Duration::seconds(offset_secs),
    }
}

pub fn choice(id: i64, question: &str, options: &[&str], answer: &str) -> QuizQuestion {
    QuizQuestion {
        id: QuestionId::Number(id),
        question: question.to_string(),
        options: options.iter().map(|o| o.to_string()).collect(),
        answer: answer.to_string(),
        explanation: None,
    }
}

pub fn free_text(id: i64, question: &str, answer: &str) -> QuizQuestion {
    choice(id, question, &[], answer)
}

/// A scripted `SessionBridge`: grades come from a queue, everything else is recorded.
#[derive(Default)]
pub struct FakeBridge {
    grades: Mutex<VecDeque<PortResult<Grade>>>,
    grade_requests: Mutex<Vec<GradeRequest>>,
    saved: Mutex<Vec<SaveSessionRequest>>,
    fail_saves: bool,
    upload: Mutex<Option<Value>>,
    quiz: Mutex<Option<Value>>,
    uploads: Mutex<usize>,
    saved_sessions: Mutex<Vec<SavedSession>>,
    pdf_requests: Mutex<Vec<PdfRequest>>,
}

impl FakeBridge {
    pub fn failing_saves(mut self) -> Self {
        self.fail_saves = true;
        self
    }

    pub fn with_grades(self, grades: impl IntoIterator<Item = bool>) -> Self {
        {
            let mut queue = self.grades.lock().unwrap();
            for is_correct in grades {
                queue.push_back(Ok(Grade {
                    is_correct,
                    feedback: if is_correct { "Correct".into() } else { "Not quite".into() },
                }));
            }
        }
        self
    }

    pub fn push_grade_error(&self) {
        self.grades
            .lock()
            .unwrap()
            .push_back(Err(PortError::Network("connection reset".into())));
    }

    /// Scripts the raw `/upload` response body.
    pub fn with_upload(self, raw: Value) -> Self {
        *self.upload.lock().unwrap() = Some(raw);
        self
    }

    /// Scripts the raw `quizData` object of `/generate-quiz`.
    pub fn with_quiz(self, raw: Value) -> Self {
        *self.quiz.lock().unwrap() = Some(raw);
        self
    }

    pub fn with_saved(self, sessions: Vec<SavedSession>) -> Self {
        *self.saved_sessions.lock().unwrap() = sessions;
        self
    }

    pub fn pdf_requests(&self) -> Vec<PdfRequest> {
        self.pdf_requests.lock().unwrap().clone()
    }

    pub fn saved_requests(&self) -> Vec<SaveSessionRequest> {
        self.saved.lock().unwrap().clone()
    }

    pub fn grade_requests(&self) -> Vec<GradeRequest> {
        self.grade_requests.lock().unwrap().clone()
    }

    pub fn upload_count(&self) -> usize {
        *self.uploads.lock().unwrap()
    }
}

#[async_trait]
impl SessionBridge for FakeBridge {
    async fn upload(&self, _request: UploadRequest) -> PortResult<Payload<UploadResult>> {
        *self.uploads.lock().unwrap() += 1;
        let raw = self.upload.lock().unwrap().clone();
        scripted(raw, "no upload scripted")
    }

    async fn generate_quiz(&self, _text: &str, _count: u32, _kind: QuizKind) -> PortResult<Payload<QuizData>> {
        let raw = self.quiz.lock().unwrap().clone();
        scripted(raw, "no quiz scripted")
    }

    async fn grade(&self, request: &GradeRequest) -> PortResult<Grade> {
        self.grade_requests.lock().unwrap().push(request.clone());
        self.grades
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(PortError::Unexpected("no grade scripted".into())))
    }

    async fn chat(&self, question: &str, _pdf_text: &str) -> PortResult<String> {
        Ok(format!("answer to {}", question))
    }

    async fn render_pdf(&self, request: &PdfRequest) -> PortResult<Bytes> {
        self.pdf_requests.lock().unwrap().push(request.clone());
        Ok(Bytes::from_static(b"%PDF-1.4"))
    }

    async fn save_session(&self, request: &SaveSessionRequest) -> PortResult<()> {
        if self.fail_saves {
            return Err(PortError::Backend {
                status: 500,
                message: "database unavailable".into(),
            });
        }
        self.saved.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn list_saved(&self) -> PortResult<Vec<SavedSession>> {
        Ok(self.saved_sessions.lock().unwrap().clone())
    }

    async fn delete_saved(&self, _id: i64) -> PortResult<()> {
        Ok(())
    }
}

fn scripted<T: DeserializeOwned>(raw: Option<Value>, missing: &str) -> PortResult<Payload<T>> {
    let raw = raw.ok_or_else(|| PortError::Unexpected(missing.to_string()))?;
    Payload::from_raw(raw).map_err(|e| PortError::Decode(e.to_string()))
}
