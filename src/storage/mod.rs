//! Local persistence for client state
//!
//! Everything is stored as JSON text under fixed keys in a [`KeyValueStore`].
//! Reading a value that no longer parses is not an error for callers: it is
//! logged and the default is used instead.

pub mod favorites;
pub mod file;
pub mod history;
pub mod prefs;

pub use favorites::Favorites;
pub use file::FileStore;
pub use history::SearchHistory;
pub use prefs::Preferences;

use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;

use crate::error::StorageError;

pub const FAVORITES_KEY: &str = "kabuso_favorites";
pub const SEARCH_HISTORY_KEY: &str = "kabuso_search_history";
pub const VOLUME_KEY: &str = "kabuso_volume";
pub const PLAYBACK_MODE_KEY: &str = "kabuso_playback_mode";

/// String key/value persistence
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-process store, lost on exit
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// Read and decode a JSON value. `Ok(None)` when the key is absent.
pub fn load_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match store.get(key)? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StorageError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        None => Ok(None),
    }
}

/// Like [`load_json`], but any failure is logged and yields `T::default()`
pub fn load_or_default<T: DeserializeOwned + Default>(store: &dyn KeyValueStore, key: &str) -> T {
    match load_json(store, key) {
        Ok(value) => value.unwrap_or_default(),
        Err(e) => {
            tracing::warn!("Ignoring stored {}: {}", key, e);
            T::default()
        }
    }
}

pub fn save_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|e| StorageError::Write(e.to_string()))?;
    store.set(key, &raw)
}
