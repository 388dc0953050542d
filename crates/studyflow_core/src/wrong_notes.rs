//! crates/studyflow_core/src/wrong_notes.rs
//!
//! The persisted, deduplicated set of wrong notes for the study session in progress.
//!
//! Every mutation is written through to the `KeyValueStore` immediately, so a
//! crash or reload never loses a note that was already graded wrong. Reads are
//! self-healing: missing or corrupted data is treated as an empty set.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::domain::{NoteKey, SessionId, WrongNote};
use crate::error::StudyResult;
use crate::ports::{KeyValueStore, SaveSessionRequest, SessionBridge, StoreError, WrongNotePayload};

/// Storage key of the pending wrong-note set.
pub const WRONG_NOTES_KEY: &str = "wrong_notes";

#[derive(Clone)]
pub struct WrongNoteStore {
    storage: Arc<dyn KeyValueStore>,
}

impl WrongNoteStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// Inserts `note`, replacing any stored note with the same
    /// `(question, correct_answer)` key, and persists the full set.
    pub fn add(&self, note: WrongNote) -> Result<(), StoreError> {
        if note.question.trim().is_empty() {
            warn!("Ignoring wrong note with an empty question");
            return Ok(());
        }
        let mut notes = self.read_persisted();
        notes.retain(|existing| !existing.same_key(&note));
        notes.push(note);
        self.write(&notes)
    }

    /// Returns the consolidated set, newest first, and writes the cleaned set back.
    pub fn load(&self) -> Vec<WrongNote> {
        let notes = consolidate(self.read_persisted());
        if let Err(e) = self.write(&notes) {
            warn!("Failed to re-persist consolidated wrong notes: {}", e);
        }
        notes
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.storage.remove(WRONG_NOTES_KEY)
    }

    /// Sends the consolidated set with the session payloads to the backend and
    /// clears the local set only once the backend has accepted it.
    ///
    /// Returns the number of notes saved. On failure the local set is untouched.
    /// Once the backend has accepted the save, a failure to clear the local set
    /// is only logged.
    pub async fn flush_to_backend(
        &self,
        bridge: &dyn SessionBridge,
        session_id: SessionId,
        summary_data: Option<Value>,
        quiz_data: Option<Value>,
    ) -> StudyResult<usize> {
        let notes = self.load();
        let request = SaveSessionRequest {
            session_id,
            summary_data,
            quiz_data,
            wrong_notes: notes.iter().map(WrongNotePayload::from).collect(),
        };

        bridge.save_session(&request).await?;
        if let Err(e) = self.clear() {
            warn!("Session {} was saved but the local wrong notes could not be cleared: {}", session_id, e);
        }
        info!("Saved session {} with {} wrong notes", session_id, notes.len());
        Ok(notes.len())
    }

    fn read_persisted(&self) -> Vec<WrongNote> {
        let Some(raw) = self.storage.get(WRONG_NOTES_KEY) else {
            return Vec::new();
        };
        let entries = match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(entries)) => entries,
            Ok(_) => {
                warn!("Stored wrong notes are not a list; starting from an empty set");
                return Vec::new();
            }
            Err(e) => {
                warn!("Stored wrong notes are unreadable ({}); starting from an empty set", e);
                return Vec::new();
            }
        };

        entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value::<WrongNote>(entry).ok())
            .filter(|note| !note.question.trim().is_empty())
            .collect()
    }

    fn write(&self, notes: &[WrongNote]) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(notes).map_err(|source| StoreError::Encode {
            key: WRONG_NOTES_KEY.to_string(),
            source,
        })?;
        self.storage.set(WRONG_NOTES_KEY, &encoded)
    }
}

/// Deduplicates by note key and sorts by `created_at`, newest first.
///
/// When a key repeats, the note with the later `created_at` is kept; on a tie
/// the one stored later wins, matching the overwrite semantics of `add`.
pub fn consolidate(notes: Vec<WrongNote>) -> Vec<WrongNote> {
    let mut positions: HashMap<NoteKey, usize> = HashMap::new();
    let mut unique: Vec<WrongNote> = Vec::with_capacity(notes.len());

    for note in notes {
        match positions.get(&note.key()) {
            Some(&pos) => {
                if note.created_at >= unique[pos].created_at {
                    unique[pos] = note;
                }
            }
            None => {
                positions.insert(note.key(), unique.len());
                unique.push(note);
            }
        }
    }

    unique.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    unique
}
