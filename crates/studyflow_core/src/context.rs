//! crates/studyflow_core/src/context.rs
//!
//! Typed access to the client-persisted study state other than wrong notes:
//! the current session id, the last summary and quiz payloads, the results of
//! the last quiz attempt, the document name and the signed-in user.
//!
//! All values are plain JSON with no schema version. A value that no longer
//! parses reads as absent. The summary and quiz payloads are stored exactly as
//! the backend sent them and only read through the typed views.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::domain::{AuthState, QuizData, QuizResult, SessionId, UploadResult};
use crate::ports::{KeyValueStore, StoreError};

pub const SESSION_ID_KEY: &str = "session_id";
pub const SUMMARY_KEY: &str = "summary";
pub const QUIZ_KEY: &str = "quiz";
pub const QUIZ_RESULTS_KEY: &str = "quiz_results";
pub const CUSTOM_FILENAME_KEY: &str = "custom_filename";
pub const AUTH_KEY: &str = "auth";

#[derive(Clone)]
pub struct StudyContext {
    storage: Arc<dyn KeyValueStore>,
}

impl StudyContext {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.read(SESSION_ID_KEY)
    }

    pub fn set_session_id(&self, id: Option<SessionId>) -> Result<(), StoreError> {
        match id {
            Some(id) => self.write(SESSION_ID_KEY, &id),
            None => self.storage.remove(SESSION_ID_KEY),
        }
    }

    pub fn summary(&self) -> Option<UploadResult> {
        self.read(SUMMARY_KEY)
    }

    /// The stored summary exactly as the backend sent it.
    pub fn summary_value(&self) -> Option<Value> {
        self.read(SUMMARY_KEY)
    }

    pub fn set_summary(&self, raw: &Value) -> Result<(), StoreError> {
        self.write(SUMMARY_KEY, raw)
    }

    pub fn quiz(&self) -> Option<QuizData> {
        self.read(QUIZ_KEY)
    }

    pub fn quiz_value(&self) -> Option<Value> {
        self.read(QUIZ_KEY)
    }

    pub fn set_quiz(&self, raw: Option<&Value>) -> Result<(), StoreError> {
        match raw {
            Some(raw) => self.write(QUIZ_KEY, raw),
            None => self.storage.remove(QUIZ_KEY),
        }
    }

    /// Results of the last quiz attempt, empty when none was recorded.
    pub fn quiz_results(&self) -> Vec<QuizResult> {
        self.read(QUIZ_RESULTS_KEY).unwrap_or_default()
    }

    pub fn set_quiz_results(&self, results: &[QuizResult]) -> Result<(), StoreError> {
        if results.is_empty() {
            return self.storage.remove(QUIZ_RESULTS_KEY);
        }
        self.write(QUIZ_RESULTS_KEY, results)
    }

    pub fn custom_filename(&self) -> Option<String> {
        self.read(CUSTOM_FILENAME_KEY)
    }

    pub fn set_custom_filename(&self, name: &str) -> Result<(), StoreError> {
        self.write(CUSTOM_FILENAME_KEY, &name)
    }

    pub fn auth(&self) -> Option<AuthState> {
        self.read(AUTH_KEY)
    }

    pub fn set_auth(&self, auth: &AuthState) -> Result<(), StoreError> {
        self.write(AUTH_KEY, auth)
    }

    pub fn clear_auth(&self) -> Result<(), StoreError> {
        self.storage.remove(AUTH_KEY)
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.storage.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring unreadable value for '{}': {}", key, e);
                None
            }
        }
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(value).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.storage.set(key, &encoded)
    }
}
