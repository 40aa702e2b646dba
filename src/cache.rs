//! Time-boxed in-memory memoization
//!
//! One `TtlCache` is built per concern at startup and shared through the
//! server state. Reads and writes are last-writer-wins; stale entries are
//! ignored by [`TtlCache::get`] but kept for [`TtlCache::get_stale`] until
//! they are overwritten or trimmed.

use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

/// A cached value with its insertion time
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub key: String,
    pub data: V,
    pub inserted_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() < ttl
    }
}

/// Snapshot of the cache contents
#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub entries: Vec<String>,
}

/// Key/value cache with a fixed freshness window and a soft size cap
pub struct TtlCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
    ttl: Duration,
    max_entries: usize,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh value for `key`, if any
    pub fn get(&self, key: &str) -> Option<V> {
        self.entries
            .get(key)
            .filter(|entry| entry.is_fresh(self.ttl))
            .map(|entry| entry.data.clone())
    }

    /// Value for `key` regardless of age
    pub fn get_stale(&self, key: &str) -> Option<V> {
        self.entries.get(key).map(|entry| entry.data.clone())
    }

    /// Insert or overwrite `key`, then trim if oversized
    pub fn insert(&self, key: impl Into<String>, data: V) {
        let key = key.into();
        self.entries.insert(
            key.clone(),
            CacheEntry {
                key,
                data,
                inserted_at: Instant::now(),
            },
        );
        self.trim();
    }

    /// Drop the oldest quarter of entries once the cap is exceeded
    fn trim(&self) {
        let len = self.entries.len();
        if len <= self.max_entries {
            return;
        }

        let mut by_age: Vec<(String, Instant)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.inserted_at))
            .collect();
        by_age.sort_by_key(|(_, inserted_at)| *inserted_at);

        let to_remove = (len / 4).max(len - self.max_entries);
        for (key, _) in by_age.into_iter().take(to_remove) {
            self.entries.remove(&key);
        }
        tracing::debug!("Cache trimmed {} entries ({} remain)", to_remove, self.entries.len());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.len(),
            entries: self.entries.iter().map(|e| e.key().clone()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fresh_then_stale() {
        let cache = TtlCache::new(Duration::from_secs(60), 10);
        cache.insert("trending", vec![1, 2, 3]);

        assert_eq!(cache.get("trending"), Some(vec![1, 2, 3]));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.get("trending"), None);
        assert_eq!(cache.get_stale("trending"), Some(vec![1, 2, 3]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_refreshes() {
        let cache = TtlCache::new(Duration::from_secs(60), 10);
        cache.insert("k", 1);
        tokio::time::advance(Duration::from_secs(59)).await;
        cache.insert("k", 2);
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(cache.get("k"), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_trim_removes_oldest() {
        let cache = TtlCache::new(Duration::from_secs(600), 4);
        for i in 0..5 {
            cache.insert(format!("key{i}"), i);
            tokio::time::advance(Duration::from_millis(10)).await;
        }

        assert_eq!(cache.len(), 4);
        assert!(cache.get_stale("key0").is_none());
        assert_eq!(cache.get("key4"), Some(4));
    }

    #[tokio::test]
    async fn test_stats() {
        let cache: TtlCache<u8> = TtlCache::new(Duration::from_secs(1), 8);
        assert!(cache.is_empty());
        cache.insert("a", 1);
        let stats = cache.stats();
        assert_eq!(stats.size, 1);
        assert_eq!(stats.entries, vec!["a".to_string()]);
        cache.clear();
        assert!(cache.is_empty());
    }
}
