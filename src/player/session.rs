//! Drives a [`PlayerState`]: persistence and background related fetches

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use super::state::{Action, Effect, PlayerState};
use crate::constants::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::error::SearchError;
use crate::storage::{KeyValueStore, Preferences};
use crate::tracks::{Track, VideoId};

/// Where the player gets tracks to continue with
#[async_trait]
pub trait RelatedSource: Send + Sync {
    /// Tracks related to `seed`. `query` overrides the server-side lookup of
    /// the seed's title.
    async fn related(&self, seed: &VideoId, query: Option<&str>) -> Result<Vec<Track>, SearchError>;
}

#[derive(Debug, Deserialize)]
struct RelatedResponse {
    tracks: Vec<Track>,
}

/// [`RelatedSource`] backed by a running API server
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ApiClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl RelatedSource for ApiClient {
    async fn related(&self, seed: &VideoId, query: Option<&str>) -> Result<Vec<Track>, SearchError> {
        let url = format!("{}/api/related/{}", self.base_url, seed);
        let mut request = self.client.get(&url).timeout(self.timeout);
        if let Some(q) = query {
            request = request.query(&[("q", q)]);
        }

        let response = request.send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(SearchError::Status(status.as_u16()));
        }
        let body: RelatedResponse = response.json().await?;
        Ok(body.tracks)
    }
}

/// Owns the player state and fulfils the effects that are not audio output.
///
/// [`Session::dispatch`] returns only the effects meant for the audio
/// element. Related fetches run as tokio tasks; their results come back
/// through [`Session::next_completion`].
pub struct Session {
    state: PlayerState,
    store: Arc<dyn KeyValueStore>,
    related: Arc<dyn RelatedSource>,
    rng: StdRng,
    completions_tx: mpsc::UnboundedSender<Action>,
    completions_rx: mpsc::UnboundedReceiver<Action>,
}

impl Session {
    pub fn new(store: Arc<dyn KeyValueStore>, related: Arc<dyn RelatedSource>) -> Self {
        Self::with_rng(store, related, StdRng::from_entropy())
    }

    pub fn with_rng(
        store: Arc<dyn KeyValueStore>,
        related: Arc<dyn RelatedSource>,
        rng: StdRng,
    ) -> Self {
        let prefs = Preferences::load(store.as_ref());
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            state: PlayerState::new(prefs),
            store,
            related,
            rng,
            completions_tx,
            completions_rx,
        }
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn dispatch(&mut self, action: Action) -> Vec<Effect> {
        let effects = self.state.dispatch(action, &mut self.rng);
        effects
            .into_iter()
            .filter_map(|effect| match effect {
                Effect::Persist(prefs) => {
                    if let Err(e) = prefs.save(self.store.as_ref()) {
                        tracing::warn!("Failed to save preferences: {}", e);
                    }
                    None
                }
                Effect::FetchRelated { seed, query } => {
                    self.spawn_related(seed, Some(query), true);
                    None
                }
                Effect::PrefetchRelated { seed } => {
                    self.spawn_related(seed, None, false);
                    None
                }
                other => Some(other),
            })
            .collect()
    }

    /// Wait for the next background fetch and apply it. Pending forever when
    /// nothing is in flight.
    pub async fn next_completion(&mut self) -> Vec<Effect> {
        match self.completions_rx.recv().await {
            Some(action) => self.dispatch(action),
            None => Vec::new(),
        }
    }

    fn spawn_related(&self, seed: VideoId, query: Option<String>, for_next: bool) {
        let source = Arc::clone(&self.related);
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let action = match source.related(&seed, query.as_deref()).await {
                Ok(tracks) => {
                    tracing::debug!("Fetched {} related tracks for {}", tracks.len(), seed);
                    Action::RelatedLoaded {
                        seed,
                        tracks,
                        for_next,
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to fetch related tracks for {}: {}", seed, e);
                    Action::RelatedFailed { seed, for_next }
                }
            };
            let _ = tx.send(action);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::player::state::tests::track;
    use crate::player::PlaybackMode;
    use crate::resolver::tests::cascade_of;
    use crate::search::catalog::tests::FakeBackend;
    use crate::search::Catalog;
    use crate::storage::MemoryStore;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct FakeRelated {
        calls: Mutex<Vec<(String, Option<String>)>>,
        tracks: Vec<Track>,
    }

    #[async_trait]
    impl RelatedSource for FakeRelated {
        async fn related(
            &self,
            seed: &VideoId,
            query: Option<&str>,
        ) -> Result<Vec<Track>, SearchError> {
            self.calls
                .lock()
                .push((seed.to_string(), query.map(str::to_string)));
            if self.tracks.is_empty() {
                return Err(SearchError::Status(503));
            }
            Ok(self.tracks.clone())
        }
    }

    fn session(store: Arc<dyn KeyValueStore>, related: Arc<FakeRelated>) -> Session {
        Session::with_rng(store, related, StdRng::seed_from_u64(11))
    }

    #[tokio::test]
    async fn test_prefetch_tops_up_queue() {
        let related = Arc::new(FakeRelated {
            tracks: vec![track("bbbbbbbbbbb"), track("ccccccccccc")],
            ..Default::default()
        });
        let mut session = session(Arc::new(MemoryStore::new()), related.clone());

        let effects = session.dispatch(Action::Play {
            track: track("aaaaaaaaaaa"),
            enqueue: true,
            play_now: true,
        });
        assert_eq!(effects, vec![Effect::Load(track("aaaaaaaaaaa"))]);
        assert!(session.dispatch(Action::Started).is_empty());

        assert!(session.next_completion().await.is_empty());
        assert_eq!(session.state().queue.len(), 3);
        assert_eq!(
            related.calls.lock().clone(),
            vec![("aaaaaaaaaaa".to_string(), None)]
        );

        let effects = session.dispatch(Action::Ended);
        assert_eq!(effects, vec![Effect::Load(track("bbbbbbbbbbb"))]);
    }

    #[tokio::test]
    async fn test_failed_next_fetch_surfaces_error() {
        let related = Arc::new(FakeRelated::default());
        let mut session = session(Arc::new(MemoryStore::new()), related.clone());
        session.dispatch(Action::Play {
            track: track("aaaaaaaaaaa"),
            enqueue: true,
            play_now: true,
        });

        assert!(session.dispatch(Action::Ended).is_empty());
        assert!(session.next_completion().await.is_empty());
        assert_eq!(
            session.state().error.as_deref(),
            Some(crate::player::state::NEXT_SONG_FAILED)
        );
        assert_eq!(related.calls.lock()[0].1.as_deref(), Some("song a Band"));
    }

    #[tokio::test]
    async fn test_preferences_persist_across_sessions() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut first = session(store.clone(), Arc::new(FakeRelated::default()));
        assert_eq!(first.dispatch(Action::SetVolume(0.2)), vec![Effect::ApplyVolume(0.2)]);
        first.dispatch(Action::SetMode(PlaybackMode::Shuffle));

        let second = session(store, Arc::new(FakeRelated::default()));
        assert_eq!(second.state().volume, 0.2);
        assert_eq!(second.state().mode, PlaybackMode::Shuffle);
    }

    #[tokio::test]
    async fn test_api_client_against_router() {
        let catalog = Catalog::new(Arc::new(FakeBackend::default()), &CacheConfig::default());
        let (cascade, _) = cascade_of(&[]);
        let state = Arc::new(crate::api::AppState::new(catalog, cascade));
        let app = crate::api::router(state, None);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = ApiClient::new(reqwest::Client::new(), format!("http://{}/", addr));
        let seed = VideoId::parse("dQw4w9WgXcQ").unwrap();

        let tracks = client.related(&seed, Some("song Band")).await.unwrap();
        assert_eq!(tracks.len(), 5);
        assert!(tracks.iter().all(|t| t.video_id != seed));

        // Unknown seed without a query is a 404 upstream
        assert!(client.related(&seed, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_api_client_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let client = ApiClient::new(reqwest::Client::new(), format!("http://{}", addr))
            .with_timeout(Duration::from_millis(200));
        let seed = VideoId::parse("dQw4w9WgXcQ").unwrap();
        let err = client.related(&seed, None).await.unwrap_err();
        assert!(matches!(err, SearchError::Http(ref e) if e.is_timeout()), "{err}");
    }
}
