//! crates/studyflow_core/src/memory.rs
//!
//! An in-process `KeyValueStore`, used when nothing needs to outlive the process.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::ports::{KeyValueStore, StoreError};

#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().ok()?;
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|e| StoreError::Write {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|e| StoreError::Write {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        entries.remove(key);
        Ok(())
    }
}
