//! # Kabuso
//!
//! Free music streaming backend and client player state.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────── CLIENT ─────────────────────────────────┐
//! │  ┌──────────────┐   actions   ┌──────────────┐   effects   ┌──────────┐ │
//! │  │ audio events │ ──────────▶ │ PlayerState  │ ──────────▶ │ Session  │ │
//! │  │  user input  │             │  (reducer)   │             │  driver  │ │
//! │  └──────────────┘             └──────────────┘             └────┬─────┘ │
//! │        favorites / history / volume ◀── storage::KeyValueStore  │       │
//! └──────────────────────────────────────────────────────────────────┼───────┘
//!                                                                    │ HTTP
//! ┌──────────────────────────────── SERVER ───────────────────────────┼──────┐
//! │  ┌────────────────────────── api (axum) ──────────────────────────▼───┐ │
//! │  │ /search /trending /artist /genre /related/:id /video/:id /stream/:id│ │
//! │  └──────┬──────────────────────────────────────────────────┬──────────┘ │
//! │         ▼                                                  ▼            │
//! │  ┌──────────────┐  ┌──────────┐                  ┌───────────────────┐  │
//! │  │   Catalog    │─▶│ TtlCache │                  │ resolver::Cascade │  │
//! │  └──────┬───────┘  └──────────┘                  │ proxy → innertube │  │
//! │         ▼                                        │   → watch page    │  │
//! │  ┌──────────────────────────────┐                └─────────┬─────────┘  │
//! │  │ SearchBackend: scrape | api  │                          ▼            │
//! │  └──────────────────────────────┘                 redirect or relay     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod player;
pub mod resolver;
pub mod search;
pub mod storage;
pub mod tracks;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    /// Name used for config directories and the user agent
    pub const APP_NAME: &str = "kabuso";

    /// Default HTTP port for the API server
    pub const DEFAULT_HTTP_PORT: u16 = 3000;

    /// Result count when the client does not ask for one
    pub const DEFAULT_RESULT_LIMIT: usize = 20;

    /// Upper bound on any result list
    pub const MAX_RESULT_LIMIT: usize = 50;

    /// Number of trending tracks kept after aggregation
    pub const TRENDING_SIZE: usize = 24;

    /// Results requested per trending seed query
    pub const TRENDING_SEED_LIMIT: usize = 10;

    /// Number of related tracks returned by default
    pub const RELATED_SIZE: usize = 5;

    /// Minimum length of a free-text search query
    pub const MIN_QUERY_LEN: usize = 2;

    /// Trending memoization window (30 minutes)
    pub const DEFAULT_TRENDING_TTL_SECS: u64 = 30 * 60;

    /// Search memoization window (20 minutes)
    pub const DEFAULT_SEARCH_TTL_SECS: u64 = 20 * 60;

    /// Soft cap on entries per cache
    pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 50;

    /// Per-strategy timeout for audio resolution
    pub const DEFAULT_ATTEMPT_TIMEOUT_SECS: u64 = 8;

    /// Timeout for search/metadata calls
    pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

    /// Piped-compatible instances tried by the proxy strategy
    pub const DEFAULT_PROXY_INSTANCES: &[&str] = &[
        "https://pipedapi.kavin.rocks",
        "https://pipedapi.adminforge.de",
    ];

    /// Browser user agent for scraping requests
    pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

    /// Maximum entries kept in playback history
    pub const HISTORY_SIZE: usize = 10;

    /// Maximum entries kept in search history
    pub const SEARCH_HISTORY_SIZE: usize = 10;

    /// Queue length at or below which related tracks are prefetched
    pub const PREFETCH_THRESHOLD: usize = 2;

    /// Initial player volume
    pub const DEFAULT_VOLUME: f32 = 0.7;
}
