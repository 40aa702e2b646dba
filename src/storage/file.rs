//! JSON-file backed store

use directories::ProjectDirs;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::KeyValueStore;
use crate::constants::APP_NAME;
use crate::error::StorageError;

/// All keys kept in one JSON object on disk. Every write rewrites the file
/// through a temporary sibling and a rename.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Default location (`<data dir>/kabuso/storage.json`)
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.data_dir().join("storage.json"))
    }

    /// Open `path`, starting empty when it is missing or unreadable as JSON
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Discarding unreadable store {}: {}", path.display(), e);
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(StorageError::Read(format!("{}: {}", path.display(), e))),
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let write_err = |e: std::io::Error| StorageError::Write(format!("{}: {}", self.path.display(), e));
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let content =
            serde_json::to_string_pretty(entries).map_err(|e| StorageError::Write(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content).map_err(write_err)?;
        std::fs::rename(&tmp, &self.path).map_err(write_err)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("kabuso-store-{}", uuid::Uuid::new_v4()))
            .join("storage.json")
    }

    #[test]
    fn test_values_survive_reopen() {
        let path = temp_path();
        let store = FileStore::open(&path).unwrap();
        store.set("kabuso_volume", "0.4").unwrap();
        store.set("other", "\"x\"").unwrap();
        store.remove("other").unwrap();
        drop(store);

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("kabuso_volume").unwrap().as_deref(), Some("0.4"));
        assert_eq!(reopened.get("other").unwrap(), None);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let path = temp_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[1, 2").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("kabuso_volume").unwrap(), None);
        store.set("kabuso_volume", "1").unwrap();
        assert_eq!(
            FileStore::open(&path).unwrap().get("kabuso_volume").unwrap().as_deref(),
            Some("1")
        );

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
