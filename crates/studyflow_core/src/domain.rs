//! crates/studyflow_core/src/domain.rs
//!
//! Defines the core data structures for the study client: wrong notes, quiz
//! questions and results, and the typed shapes of the backend payloads.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

//=========================================================================================
// Identifiers
//=========================================================================================

/// A backend-issued study session id. Opaque to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub i64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A question id as emitted by the quiz generator. The backend sends either
/// an integer or a string, so both are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuestionId {
    Number(i64),
    Text(String),
}

impl Default for QuestionId {
    fn default() -> Self {
        QuestionId::Number(0)
    }
}

//=========================================================================================
// Wrong notes
//=========================================================================================

/// The identity of a wrong note: two notes with the same question and correct
/// answer are the same logical note.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NoteKey {
    pub question: String,
    pub correct_answer: String,
}

/// A record of a single incorrectly answered quiz question, pending save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrongNote {
    pub question: String,
    pub user_answer: String,
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl WrongNote {
    pub fn key(&self) -> NoteKey {
        NoteKey {
            question: self.question.clone(),
            correct_answer: self.correct_answer.clone(),
        }
    }

    pub fn same_key(&self, other: &WrongNote) -> bool {
        self.question == other.question && self.correct_answer == other.correct_answer
    }
}

//=========================================================================================
// Quiz
//=========================================================================================

/// The three quiz formats the generator supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizKind {
    /// Four-option multiple choice.
    Objective,
    /// O/X questions.
    #[serde(rename = "truefalse")]
    TrueFalse,
    /// Free-text answers graded by the backend.
    Short,
}

impl QuizKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuizKind::Objective => "objective",
            QuizKind::TrueFalse => "truefalse",
            QuizKind::Short => "short",
        }
    }
}

impl std::str::FromStr for QuizKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "objective" => Ok(QuizKind::Objective),
            "truefalse" | "ox" => Ok(QuizKind::TrueFalse),
            "short" | "subjective" => Ok(QuizKind::Short),
            other => Err(format!("unknown quiz type '{}'", other)),
        }
    }
}

/// A single generated question. An empty `options` list means free-text mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    #[serde(default)]
    pub id: QuestionId,
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub answer: String,
    #[serde(default)]
    pub explanation: Option<String>,
}

impl QuizQuestion {
    pub fn is_free_text(&self) -> bool {
        self.options.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuizData {
    #[serde(default, alias = "quizzes")]
    pub questions: Vec<QuizQuestion>,
}

/// The backend's verdict on one answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    pub is_correct: bool,
    #[serde(default)]
    pub feedback: String,
}

/// The outcome of one graded question within an attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub index: usize,
    pub question: String,
    pub user_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
    pub feedback: String,
}

/// End-of-attempt summary shown once the runner completes.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizReport {
    pub total: usize,
    pub correct: usize,
    pub wrong: Vec<QuizResult>,
}

impl QuizReport {
    pub fn from_results(results: &[QuizResult]) -> Self {
        let correct = results.iter().filter(|r| r.is_correct).count();
        let wrong = results.iter().filter(|r| !r.is_correct).cloned().collect();
        Self {
            total: results.len(),
            correct,
            wrong,
        }
    }

    /// Rounded percentage of correct answers, `0` for an empty attempt.
    pub fn score_percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.correct as f64 / self.total as f64) * 100.0).round() as u32
    }
}

//=========================================================================================
// Typed decode with a fallback
//=========================================================================================

/// A backend payload field that either decoded into `T` or is unavailable.
///
/// Malformed fields do not fail the surrounding response; they become
/// `Unavailable` with the decode error so callers can render a placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded<T> {
    Available(T),
    Unavailable { reason: String },
}

impl<T> Decoded<T> {
    pub fn as_option(&self) -> Option<&T> {
        match self {
            Decoded::Available(value) => Some(value),
            Decoded::Unavailable { .. } => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Decoded::Available(value) => Some(value),
            Decoded::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Decoded::Available(_))
    }
}

impl<T: DeserializeOwned> Decoded<T> {
    pub fn from_value(value: Value) -> Self {
        if value.is_null() {
            return Decoded::Unavailable {
                reason: "field is null".to_string(),
            };
        }
        match serde_json::from_value(value) {
            Ok(decoded) => Decoded::Available(decoded),
            Err(e) => Decoded::Unavailable {
                reason: e.to_string(),
            },
        }
    }
}

impl<T> Default for Decoded<T> {
    fn default() -> Self {
        Decoded::Unavailable {
            reason: "field is missing".to_string(),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Decoded<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Decoded::from_value(value))
    }
}

impl<T: Serialize> Serialize for Decoded<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Decoded::Available(value) => value.serialize(serializer),
            Decoded::Unavailable { .. } => serializer.serialize_none(),
        }
    }
}

/// A decoded backend payload kept together with the JSON it was decoded from.
///
/// `raw` is what gets stored and sent back to the backend; `typed` is only the
/// client's view of it, so fields the client does not model survive a round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload<T> {
    pub typed: T,
    pub raw: Value,
}

impl<T: DeserializeOwned> Payload<T> {
    pub fn from_raw(raw: Value) -> Result<Self, serde_json::Error> {
        let typed = T::deserialize(&raw)?;
        Ok(Self { typed, raw })
    }
}

//=========================================================================================
// Backend payloads
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarySection {
    pub main_title: String,
    #[serde(default)]
    pub content: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyConcept {
    pub title: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectedQuestion {
    pub question: String,
    #[serde(default)]
    pub answer: String,
}

/// Everything the backend returns after a document upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    #[serde(default)]
    pub session_id: Option<SessionId>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub keywords: Decoded<Vec<String>>,
    #[serde(default)]
    pub structured_summary: Decoded<Vec<KeyConcept>>,
    #[serde(default)]
    pub full_summary: Decoded<Vec<SummarySection>>,
    #[serde(default)]
    pub expected_questions: Decoded<Vec<ExpectedQuestion>>,
    #[serde(default)]
    pub quiz_data: Decoded<QuizData>,
    #[serde(default)]
    pub pdf_url: Option<String>,
    #[serde(default)]
    pub pdf_text: Option<String>,
    #[serde(default)]
    pub translated_text: Option<String>,
}

impl UploadResult {
    /// The text fed back to the quiz generator: the summary when present,
    /// otherwise the extracted document text.
    pub fn quiz_source_text(&self) -> Option<&str> {
        self.summary
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or(self.pdf_text.as_deref())
            .filter(|s| !s.trim().is_empty())
    }

    pub fn keyword_list(&self) -> Vec<String> {
        self.keywords.as_option().cloned().unwrap_or_default()
    }
}

/// A saved study session row, as listed on the user's page.
///
/// The `*_data` blobs are whatever the client sent on save. The backend returns
/// them as JSON-encoded strings; already-parsed JSON is accepted as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSession {
    pub id: i64,
    #[serde(default)]
    pub custom_filename: String,
    #[serde(default)]
    pub original_filename: Option<String>,
    #[serde(default)]
    pub file_size: Option<i64>,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub is_saved: bool,
    #[serde(default)]
    pub summary_data: Option<Value>,
    #[serde(default)]
    pub quiz_data: Option<Value>,
    #[serde(default)]
    pub wrong_notes_data: Option<Value>,
}

impl SavedSession {
    pub fn has_study_data(&self) -> bool {
        self.summary_data.is_some() || self.quiz_data.is_some() || self.wrong_notes_data.is_some()
    }

    /// The saved summary payload, unchanged.
    pub fn summary(&self) -> Decoded<Value> {
        decode_blob(self.summary_data.as_ref())
    }

    pub fn summary_text(&self) -> Option<String> {
        self.summary()
            .into_option()
            .and_then(|v| v.get("summary").and_then(Value::as_str).map(str::to_string))
    }

    pub fn keywords(&self) -> Vec<String> {
        self.summary()
            .into_option()
            .and_then(|mut v| v.get_mut("keywords").map(Value::take))
            .map(Decoded::<Vec<String>>::from_value)
            .and_then(Decoded::into_option)
            .unwrap_or_default()
    }

    pub fn quiz(&self) -> Decoded<QuizData> {
        decode_blob(self.quiz_data.as_ref())
    }

    /// Saved wrong notes. Entries that no longer decode are skipped.
    pub fn wrong_notes(&self) -> Decoded<Vec<WrongNote>> {
        match decode_blob::<Vec<Value>>(self.wrong_notes_data.as_ref()) {
            Decoded::Available(entries) => Decoded::Available(
                entries
                    .into_iter()
                    .filter_map(|entry| serde_json::from_value(entry).ok())
                    .collect(),
            ),
            Decoded::Unavailable { reason } => Decoded::Unavailable { reason },
        }
    }
}

fn decode_blob<T: DeserializeOwned>(blob: Option<&Value>) -> Decoded<T> {
    match blob {
        None => Decoded::Unavailable {
            reason: "nothing was saved".to_string(),
        },
        Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
            Ok(value) => Decoded::from_value(value),
            Err(e) => Decoded::Unavailable {
                reason: e.to_string(),
            },
        },
        Some(value) => Decoded::from_value(value.clone()),
    }
}

/// The signed-in user, as persisted next to the access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthState {
    pub token: String,
    pub user: Option<UserProfile>,
}
