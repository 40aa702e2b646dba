//! Search backends and the catalog service built on top of them
//!
//! Two interchangeable backends implement [`SearchBackend`]:
//! - [`ScrapeBackend`] reads YouTube's own result and watch pages
//! - [`DataApiBackend`] calls the official Data API v3
//!
//! Handlers never talk to a backend directly; they go through [`Catalog`],
//! which owns the memoization caches.

pub mod catalog;
pub mod data_api;
pub mod page;
pub mod scrape;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

use crate::config::{AppConfig, BackendKind};
use crate::error::{SearchError, ValidationError};
use crate::tracks::{RawVideo, VideoId, VideoInfo};

pub use catalog::Catalog;
pub use data_api::DataApiBackend;
pub use scrape::ScrapeBackend;

/// Result ordering requested from a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchOrder {
    #[default]
    Relevance,
    ViewCount,
}

impl SearchOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchOrder::Relevance => "relevance",
            SearchOrder::ViewCount => "viewCount",
        }
    }
}

/// A single backend request.
///
/// `order` and `published_after` are hints; the scraping backend ignores
/// them.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub text: String,
    pub limit: usize,
    pub order: SearchOrder,
    pub published_after: Option<DateTime<Utc>>,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>, limit: usize) -> Self {
        Self {
            text: text.into(),
            limit,
            order: SearchOrder::Relevance,
            published_after: None,
        }
    }
}

/// What the client is searching for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchKind {
    #[default]
    All,
    Artist,
    Genre,
}

impl SearchKind {
    /// Parse the `type` query parameter; unknown values mean `All`
    pub fn from_param(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("artist") => SearchKind::Artist,
            Some("genre") => SearchKind::Genre,
            _ => SearchKind::All,
        }
    }

    /// Upstream query text for a user query of this kind
    pub fn shape_query(&self, query: &str) -> String {
        match self {
            SearchKind::All => query.to_string(),
            SearchKind::Artist | SearchKind::Genre => format!("{} music", query),
        }
    }
}

impl fmt::Display for SearchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SearchKind::All => "all",
            SearchKind::Artist => "artist",
            SearchKind::Genre => "genre",
        })
    }
}

/// A search capability
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Run a video search
    async fn search(&self, query: &SearchQuery) -> Result<Vec<RawVideo>, SearchError>;

    /// Metadata for one video, `None` when upstream has no such video
    async fn video_info(&self, id: &VideoId) -> Result<Option<VideoInfo>, SearchError>;
}

/// Validate a required free-text parameter: trimmed, non-empty, at least
/// `min_len` characters.
pub fn validate_query(
    raw: Option<&str>,
    name: &'static str,
    min_len: usize,
) -> Result<String, ValidationError> {
    let query = raw.map(str::trim).unwrap_or_default();
    if query.is_empty() {
        return Err(ValidationError::MissingParameter(name));
    }
    if query.chars().count() < min_len {
        return Err(ValidationError::TooShort { name, min: min_len });
    }
    Ok(query.to_string())
}

/// Build the backend selected by `config`.
///
/// The Data API backend needs a key; without one the scraper is used.
pub fn backend_from_config(
    config: &AppConfig,
    client: reqwest::Client,
) -> Arc<dyn SearchBackend> {
    match (config.youtube.backend, config.youtube.api_key.as_deref()) {
        (BackendKind::DataApi, Some(key)) => {
            Arc::new(DataApiBackend::new(client, key, &config.youtube))
        }
        (BackendKind::DataApi, None) => {
            tracing::warn!("YouTube API key not found, falling back to the scraping backend");
            Arc::new(ScrapeBackend::new(client, &config.youtube))
        }
        (BackendKind::Scrape, _) => Arc::new(ScrapeBackend::new(client, &config.youtube)),
    }
}
