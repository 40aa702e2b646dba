//! Recent search queries

use std::sync::Arc;

use super::{load_or_default, save_json, KeyValueStore, SEARCH_HISTORY_KEY};
use crate::constants::SEARCH_HISTORY_SIZE;
use crate::error::StorageError;

/// Most recent distinct queries, newest first
pub struct SearchHistory {
    store: Arc<dyn KeyValueStore>,
    entries: Vec<String>,
}

impl SearchHistory {
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let mut entries: Vec<String> = load_or_default(store.as_ref(), SEARCH_HISTORY_KEY);
        entries.truncate(SEARCH_HISTORY_SIZE);
        Self { store, entries }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn add(&mut self, query: &str) -> Result<(), StorageError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(());
        }
        self.entries.retain(|q| q != query);
        self.entries.insert(0, query.to_string());
        self.entries.truncate(SEARCH_HISTORY_SIZE);
        self.save()
    }

    pub fn remove(&mut self, query: &str) -> Result<(), StorageError> {
        self.entries.retain(|q| q != query);
        self.save()
    }

    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.entries.clear();
        self.store.remove(SEARCH_HISTORY_KEY)
    }

    fn save(&self) -> Result<(), StorageError> {
        save_json(self.store.as_ref(), SEARCH_HISTORY_KEY, &self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_newest_first_and_distinct() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut history = SearchHistory::load(store.clone());
        history.add("lofi").unwrap();
        history.add("jazz").unwrap();
        history.add("  lofi ").unwrap();
        history.add("   ").unwrap();

        assert_eq!(history.entries(), ["lofi", "jazz"]);
        assert_eq!(SearchHistory::load(store).entries(), ["lofi", "jazz"]);
    }

    #[test]
    fn test_bounded() {
        let mut history = SearchHistory::load(Arc::new(MemoryStore::new()));
        for i in 0..15 {
            history.add(&format!("query {i}")).unwrap();
        }
        assert_eq!(history.entries().len(), SEARCH_HISTORY_SIZE);
        assert_eq!(history.entries()[0], "query 14");
        assert_eq!(history.entries()[9], "query 5");
    }

    #[test]
    fn test_remove_and_clear() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut history = SearchHistory::load(store.clone());
        history.add("a").unwrap();
        history.add("b").unwrap();
        history.remove("a").unwrap();
        assert_eq!(history.entries(), ["b"]);

        history.clear().unwrap();
        assert!(history.entries().is_empty());
        assert_eq!(store.get(SEARCH_HISTORY_KEY).unwrap(), None);
    }
}
