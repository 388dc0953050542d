//! services/client/src/adapters/file_store.rs
//!
//! This module contains the file-backed implementation of the `KeyValueStore`
//! port. Each key is stored as `<key>.json` inside the state directory.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use studyflow_core::ports::{KeyValueStore, StoreError};
use tracing::warn;

/// A `KeyValueStore` that keeps one JSON file per key under a directory.
///
/// Writes go to a temporary file that is renamed over the target, so a crash
/// mid-write leaves either the old or the new value. There is no locking
/// between processes sharing the directory; the last writer wins.
#[derive(Clone, Debug)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    /// Creates a new `FileKeyValueStore`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", file_name))
    }

    fn write_error(key: &str, e: std::io::Error) -> StoreError {
        StoreError::Write {
            key: key.to_string(),
            message: e.to_string(),
        }
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Option<String> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Some(contents),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Could not read stored '{}': {}", key, e);
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| Self::write_error(key, e))?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).map_err(|e| Self::write_error(key, e))?;
        fs::rename(&tmp, &path).map_err(|e| Self::write_error(key, e))
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::write_error(key, e)),
        }
    }
}
