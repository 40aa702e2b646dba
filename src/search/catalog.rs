//! Catalog service: the operations behind the JSON endpoints
//!
//! Wraps a [`SearchBackend`] with query shaping, normalization and the two
//! memoization caches.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use futures_util::future::join_all;
use std::sync::Arc;

use super::{SearchBackend, SearchKind, SearchOrder, SearchQuery};
use crate::cache::{CacheStats, TtlCache};
use crate::config::CacheConfig;
use crate::constants::{MAX_RESULT_LIMIT, TRENDING_SEED_LIMIT, TRENDING_SIZE};
use crate::error::SearchError;
use crate::tracks::{normalize, Track, VideoId, VideoInfo};

const TRENDING_KEY: &str = "trending";

/// Seed queries aggregated into the trending list
pub fn trending_seeds(year: i32) -> Vec<String> {
    vec![
        format!("trending songs {}", year),
        "popular music".to_string(),
        "top hits".to_string(),
        "viral songs".to_string(),
        "latest music".to_string(),
        "new releases".to_string(),
    ]
}

/// Most viewed uploads of the current year for one seed
fn trending_query(seed: &str, now: DateTime<Utc>) -> SearchQuery {
    let mut query = SearchQuery::new(seed, TRENDING_SEED_LIMIT);
    query.order = SearchOrder::ViewCount;
    query.published_after = Utc.with_ymd_and_hms(now.year(), 1, 1, 0, 0, 0).single();
    query
}

pub struct Catalog {
    backend: Arc<dyn SearchBackend>,
    trending: TtlCache<Vec<Track>>,
    searches: TtlCache<Vec<Track>>,
}

impl Catalog {
    pub fn new(backend: Arc<dyn SearchBackend>, config: &CacheConfig) -> Self {
        Self {
            backend,
            trending: TtlCache::new(config.trending_ttl(), config.max_entries),
            searches: TtlCache::new(config.search_ttl(), config.max_entries),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Search of the given kind. `query` must already be validated.
    pub async fn search(
        &self,
        kind: SearchKind,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Track>, SearchError> {
        let key = format!("{}:{}:{}", kind, query.trim().to_lowercase(), limit);
        if let Some(tracks) = self.searches.get(&key) {
            tracing::debug!("Search cache hit: {}", key);
            return Ok(tracks);
        }

        let request = SearchQuery::new(kind.shape_query(query.trim()), limit);
        let raw = self.backend.search(&request).await?;
        let tracks = normalize(raw, limit);
        self.searches.insert(key, tracks.clone());
        Ok(tracks)
    }

    pub async fn by_artist(&self, artist: &str, limit: usize) -> Result<Vec<Track>, SearchError> {
        self.search(SearchKind::Artist, artist, limit).await
    }

    pub async fn by_genre(&self, genre: &str, limit: usize) -> Result<Vec<Track>, SearchError> {
        self.search(SearchKind::Genre, genre, limit).await
    }

    /// Aggregated trending list, at most `limit` tracks.
    ///
    /// A fresh cached list is served as is. Otherwise every seed is queried;
    /// failed seeds are skipped. When nothing could be fetched the last
    /// list is served even if stale.
    pub async fn trending(&self, limit: usize) -> Result<Vec<Track>, SearchError> {
        let limit = limit.min(TRENDING_SIZE);
        if let Some(tracks) = self.trending.get(TRENDING_KEY) {
            return Ok(truncated(tracks, limit));
        }

        let now = Utc::now();
        let seeds = trending_seeds(now.year());
        let requests: Vec<SearchQuery> = seeds.iter().map(|seed| trending_query(seed, now)).collect();
        let results = join_all(requests.iter().map(|q| self.backend.search(q))).await;

        let mut aggregate = Vec::new();
        for (seed, result) in seeds.iter().zip(results) {
            match result {
                Ok(raw) => aggregate.extend(raw),
                Err(e) => tracing::warn!("Trending seed '{}' failed: {}", seed, e),
            }
        }

        let tracks = normalize(aggregate, TRENDING_SIZE);
        if !tracks.is_empty() {
            tracing::info!("Trending refreshed with {} tracks", tracks.len());
            self.trending.insert(TRENDING_KEY, tracks.clone());
            return Ok(truncated(tracks, limit));
        }

        match self.trending.get_stale(TRENDING_KEY) {
            Some(stale) => {
                tracing::warn!("Trending refresh produced nothing, serving stale list");
                Ok(truncated(stale, limit))
            }
            None => Err(SearchError::Empty),
        }
    }

    /// Tracks similar to `seed`, excluding the seed itself.
    ///
    /// The lookup query is `query` when given, otherwise built from the
    /// seed's title and channel.
    pub async fn related(
        &self,
        seed: &VideoId,
        query: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Track>, SearchError> {
        let query = match query.map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => q.to_string(),
            None => self
                .backend
                .video_info(seed)
                .await?
                .ok_or_else(|| SearchError::NotFound("Video not found".into()))?
                .related_query(),
        };

        // Over-fetch so that dropping the seed and duplicates still fills
        // the requested count.
        let fetch = (limit * 2).clamp(10, MAX_RESULT_LIMIT);
        let raw = self.backend.search(&SearchQuery::new(query, fetch)).await?;
        let tracks: Vec<Track> = normalize(raw, fetch)
            .into_iter()
            .filter(|t| &t.video_id != seed)
            .take(limit)
            .collect();

        if tracks.is_empty() {
            return Err(SearchError::NotFound("No related videos found".into()));
        }
        Ok(tracks)
    }

    pub async fn video_info(&self, id: &VideoId) -> Result<Option<VideoInfo>, SearchError> {
        self.backend.video_info(id).await
    }

    pub fn cache_stats(&self) -> (CacheStats, CacheStats) {
        (self.trending.stats(), self.searches.stats())
    }
}

fn truncated(mut tracks: Vec<Track>, limit: usize) -> Vec<Track> {
    tracks.truncate(limit);
    tracks
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::tracks::RawVideo;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    /// Backend returning ids derived from the query text
    #[derive(Default)]
    pub(crate) struct FakeBackend {
        pub searches: AtomicUsize,
        pub failing: AtomicBool,
        pub queries: Mutex<Vec<String>>,
        pub requests: Mutex<Vec<SearchQuery>>,
        pub info: Option<VideoInfo>,
    }

    pub(crate) fn id_for(n: usize) -> String {
        format!("vid{:08}", n)
    }

    pub(crate) fn raw(n: usize) -> RawVideo {
        RawVideo {
            id: Some(id_for(n)),
            title: Some(format!("Song {}", n)),
            channel: Some("Band".into()),
            ..Default::default()
        }
    }

    #[async_trait]
    impl SearchBackend for FakeBackend {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn search(&self, query: &SearchQuery) -> Result<Vec<RawVideo>, SearchError> {
            self.searches.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().push(query.text.clone());
            self.requests.lock().push(query.clone());
            if self.failing.load(Ordering::SeqCst) {
                return Err(SearchError::Status(503));
            }
            // Overlapping ranges so trending aggregation has duplicates
            let base = self.queries.lock().len() * 5;
            Ok((base..base + query.limit).map(raw).collect())
        }

        async fn video_info(&self, _id: &VideoId) -> Result<Option<VideoInfo>, SearchError> {
            Ok(self.info.clone())
        }
    }

    fn catalog(backend: Arc<FakeBackend>) -> Catalog {
        Catalog::new(backend, &CacheConfig::default())
    }

    #[tokio::test]
    async fn test_search_is_memoized() {
        let backend = Arc::new(FakeBackend::default());
        let catalog = catalog(backend.clone());

        let first = catalog.search(SearchKind::All, "Lofi", 5).await.unwrap();
        let second = catalog.search(SearchKind::All, "  lofi ", 5).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 5);
        assert_eq!(backend.searches.load(Ordering::SeqCst), 1);

        catalog.by_artist("Lofi", 5).await.unwrap();
        assert_eq!(backend.searches.load(Ordering::SeqCst), 2);
        assert_eq!(backend.queries.lock().last().unwrap(), "Lofi music");
    }

    #[tokio::test(start_paused = true)]
    async fn test_trending_aggregates_and_expires() {
        let backend = Arc::new(FakeBackend::default());
        let catalog = catalog(backend.clone());

        let tracks = catalog.trending(TRENDING_SIZE).await.unwrap();
        assert_eq!(tracks.len(), TRENDING_SIZE);
        assert_eq!(backend.searches.load(Ordering::SeqCst), 6);
        assert!(backend.queries.lock()[0].starts_with("trending songs "));
        let first = backend.requests.lock()[0].clone();
        assert_eq!(first.order, SearchOrder::ViewCount);
        let year_start = first.published_after.unwrap();
        assert_eq!((year_start.month(), year_start.day()), (1, 1));
        assert_eq!(year_start.year(), Utc::now().year());

        let ids: std::collections::HashSet<_> = tracks.iter().map(|t| &t.video_id).collect();
        assert_eq!(ids.len(), tracks.len());

        catalog.trending(10).await.unwrap();
        assert_eq!(backend.searches.load(Ordering::SeqCst), 6);

        tokio::time::advance(Duration::from_secs(31 * 60)).await;
        catalog.trending(10).await.unwrap();
        assert_eq!(backend.searches.load(Ordering::SeqCst), 12);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trending_serves_stale_on_failure() {
        let backend = Arc::new(FakeBackend::default());
        let catalog = catalog(backend.clone());

        let fresh = catalog.trending(TRENDING_SIZE).await.unwrap();
        backend.failing.store(true, Ordering::SeqCst);
        tokio::time::advance(Duration::from_secs(60 * 60)).await;

        let stale = catalog.trending(TRENDING_SIZE).await.unwrap();
        assert_eq!(fresh, stale);
    }

    #[tokio::test]
    async fn test_trending_fails_without_cache() {
        let backend = Arc::new(FakeBackend::default());
        backend.failing.store(true, Ordering::SeqCst);
        let catalog = catalog(backend);
        assert!(matches!(catalog.trending(24).await, Err(SearchError::Empty)));
    }

    #[tokio::test]
    async fn test_related_excludes_seed() {
        let seed = VideoId::parse(&id_for(6)).unwrap();
        let backend = Arc::new(FakeBackend {
            info: Some(VideoInfo {
                video_id: seed.clone(),
                title: "Song 6".into(),
                artists: "Band".into(),
                duration: 200,
                views: 0,
                thumbnail: String::new(),
                description: None,
                published_at: None,
                channel_id: None,
            }),
            ..Default::default()
        });
        let catalog = catalog(backend.clone());

        let related = catalog.related(&seed, None, 5).await.unwrap();
        assert_eq!(related.len(), 5);
        assert!(related.iter().all(|t| t.video_id != seed));
        assert_eq!(backend.queries.lock()[0], "Song 6 Band");

        catalog.related(&seed, Some("custom"), 3).await.unwrap();
        assert_eq!(backend.queries.lock()[1], "custom");
    }

    #[tokio::test]
    async fn test_related_unknown_seed() {
        let catalog = catalog(Arc::new(FakeBackend::default()));
        let seed = VideoId::parse("dQw4w9WgXcQ").unwrap();
        assert!(matches!(
            catalog.related(&seed, None, 5).await,
            Err(SearchError::NotFound(_))
        ));
    }
}
