//! Local persisted state: one JSON document per collection.
//!
//! [`StateStorage`] is a tiny string key/value seam. [`FileStorage`] keeps
//! each key in `<state_dir>/<key>.json`, written atomically (temp file then
//! rename) so a crash mid-write never leaves a truncated collection.
//! [`MemoryStorage`] backs tests.
//!
//! There is no schema versioning. A stored value that does not parse, or is
//! not even UTF-8, is logged and treated as an empty collection.

use crate::error::StorageError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

pub const SOURCES_KEY: &str = "ai-notebook-sources";
pub const MESSAGES_KEY: &str = "ai-notebook-messages";
pub const NOTES_KEY: &str = "ai-notebook-notes";

/// Key/value persistence. Values are stored as written and returned as raw
/// bytes; decoding is the caller's concern.
pub trait StateStorage: Send + Sync {
    /// The stored bytes, or `None` if the key was never written.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// One JSON file per key in a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl StateStorage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.path_for(key);
        match std::fs::read(&path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir).map_err(io_err(&self.dir))?;

        let path = self.path_for(key);
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, value).map_err(io_err(&tmp_path))?;
        std::fs::rename(&tmp_path, &path).map_err(io_err(&path))?;

        debug!("Saved {} ({} bytes)", path.display(), value.len());
        Ok(())
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError {
    let path = path.to_path_buf();
    move |source| StorageError::Io { path, source }
}

/// In-memory storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed a raw value, e.g. to simulate corrupt state.
    pub fn with_entry(self, key: &str, value: impl AsRef<[u8]>) -> Self {
        self.lock().insert(key.to_string(), value.as_ref().to_vec());
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl StateStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.lock().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock().insert(key.to_string(), value.as_bytes().to_vec());
        Ok(())
    }
}

/// Load a collection; missing, undecodable or unparsable values yield an
/// empty one.
pub fn load_collection<T: DeserializeOwned>(
    storage: &dyn StateStorage,
    key: &str,
) -> Result<Vec<T>, StorageError> {
    let Some(raw) = storage.read(key)? else {
        return Ok(Vec::new());
    };
    match serde_json::from_slice(&raw) {
        Ok(items) => Ok(items),
        Err(e) => {
            warn!("Stored '{}' is not valid; starting empty ({})", key, e);
            Ok(Vec::new())
        }
    }
}

/// Serialise and write a whole collection.
pub fn save_collection<T: Serialize>(
    storage: &dyn StateStorage,
    key: &str,
    items: &[T],
) -> Result<(), StorageError> {
    let json = serde_json::to_string(items).map_err(|source| StorageError::Serialise {
        key: key.to_string(),
        source,
    })?;
    storage.write(key, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Note;

    #[test]
    fn file_storage_round_trips_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("state"));

        assert_eq!(storage.read(NOTES_KEY).unwrap(), None);
        storage.write(NOTES_KEY, "[]").unwrap();
        assert_eq!(storage.read(NOTES_KEY).unwrap().as_deref(), Some(&b"[]"[..]));

        let files: Vec<_> = std::fs::read_dir(storage.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(files, vec![format!("{NOTES_KEY}.json")]);
    }

    #[test]
    fn corrupt_collection_loads_empty() {
        let storage = MemoryStorage::new().with_entry(NOTES_KEY, "{not json");
        let notes: Vec<Note> = load_collection(&storage, NOTES_KEY).unwrap();
        assert!(notes.is_empty());
    }

    #[test]
    fn non_utf8_collection_loads_empty() {
        let storage = MemoryStorage::new().with_entry(NOTES_KEY, b"\xff\xfe[garbage");
        let notes: Vec<Note> = load_collection(&storage, NOTES_KEY).unwrap();
        assert!(notes.is_empty());
    }

    #[test]
    fn missing_collection_loads_empty() {
        let storage = MemoryStorage::new();
        let notes: Vec<Note> = load_collection(&storage, NOTES_KEY).unwrap();
        assert!(notes.is_empty());
    }
}
