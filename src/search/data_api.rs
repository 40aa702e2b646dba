//! YouTube Data API v3 backend
//!
//! A search is two calls: `search.list` for ids and snippets, then
//! `videos.list` for durations and view counts.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::{SearchBackend, SearchQuery};
use crate::config::YoutubeConfig;
use crate::error::SearchError;
use crate::tracks::normalize::{parse_iso8601_duration, PLACEHOLDER_THUMBNAIL, UNKNOWN_ARTIST, UNKNOWN_TITLE};
use crate::tracks::{RawVideo, VideoId, VideoInfo};

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Items shorter than this are treated as clips or shorts
const MIN_DURATION_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    #[serde(default)]
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    video_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: Option<String>,
    channel_title: Option<String>,
    channel_id: Option<String>,
    description: Option<String>,
    published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    high: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

impl Thumbnails {
    fn best(&self) -> Option<String> {
        [&self.high, &self.medium, &self.default]
            .into_iter()
            .flatten()
            .map(|t| t.url.clone())
            .next()
    }
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    id: String,
    #[serde(default)]
    snippet: Snippet,
    #[serde(default)]
    content_details: ContentDetails,
    #[serde(default)]
    statistics: Statistics,
}

#[derive(Debug, Default, Deserialize)]
struct ContentDetails {
    duration: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    view_count: Option<String>,
}

impl VideoItem {
    fn duration_secs(&self) -> u64 {
        self.content_details
            .duration
            .as_deref()
            .map(parse_iso8601_duration)
            .unwrap_or(0)
    }

    fn views(&self) -> u64 {
        self.statistics
            .view_count
            .as_deref()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }
}

pub struct DataApiBackend {
    client: reqwest::Client,
    api_key: String,
    region: String,
    timeout: Duration,
    base_url: String,
}

impl DataApiBackend {
    pub fn new(client: reqwest::Client, api_key: &str, config: &YoutubeConfig) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            region: config.region.clone(),
            timeout: config.request_timeout(),
            base_url: API_BASE.to_string(),
        }
    }

    /// Talk to another host speaking the same API
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<ListResponse<T>, SearchError> {
        let response = self
            .client
            .get(format!("{}/{}", self.base_url, endpoint))
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::Status(response.status().as_u16()));
        }
        response
            .json()
            .await
            .map_err(|e| SearchError::Parse(e.to_string()))
    }

    async fn videos(&self, ids: &[String], parts: &str) -> Result<Vec<VideoItem>, SearchError> {
        let list: ListResponse<VideoItem> = self
            .get("videos", &[("part", parts.to_string()), ("id", ids.join(","))])
            .await?;
        Ok(list.items)
    }

    fn search_params(&self, query: &SearchQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("part", "snippet".to_string()),
            ("q", query.text.clone()),
            ("type", "video".to_string()),
            ("maxResults", query.limit.min(50).to_string()),
            ("order", query.order.as_str().to_string()),
            ("videoDuration", "medium".to_string()),
            ("regionCode", self.region.clone()),
        ];
        if let Some(after) = query.published_after {
            params.push(("publishedAfter", after.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        params
    }
}

#[async_trait]
impl SearchBackend for DataApiBackend {
    fn name(&self) -> &'static str {
        "data-api"
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<RawVideo>, SearchError> {
        let params = self.search_params(query);
        let hits: ListResponse<SearchItem> = self.get("search", &params).await?;
        let ids: Vec<String> = hits
            .items
            .iter()
            .filter_map(|item| item.id.video_id.clone())
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        // Without details no hit passes the duration filter, so a failed
        // videos.list call yields an empty result.
        let details = match self.videos(&ids, "contentDetails,statistics").await {
            Ok(details) => details,
            Err(e) => {
                tracing::warn!("videos.list failed for '{}': {}", query.text, e);
                Vec::new()
            }
        };

        Ok(merge_results(hits.items, details))
    }

    async fn video_info(&self, id: &VideoId) -> Result<Option<VideoInfo>, SearchError> {
        let items = self
            .videos(&[id.to_string()], "snippet,contentDetails,statistics")
            .await?;
        Ok(items.into_iter().next().and_then(video_info_from_item))
    }
}

/// Join search hits with their details, keeping search order and dropping
/// hits without details, shorter than 30 s, or titled as shorts.
fn merge_results(hits: Vec<SearchItem>, details: Vec<VideoItem>) -> Vec<RawVideo> {
    let details: HashMap<&str, &VideoItem> =
        details.iter().map(|d| (d.id.as_str(), d)).collect();

    hits.into_iter()
        .filter_map(|hit| {
            let id = hit.id.video_id?;
            let detail = details.get(id.as_str())?;
            let duration = detail.duration_secs();
            let title = hit.snippet.title.clone().unwrap_or_default();
            if duration < MIN_DURATION_SECS || title.to_lowercase().contains("shorts") {
                return None;
            }
            Some(RawVideo {
                thumbnail: hit.snippet.thumbnails.best(),
                title: hit.snippet.title,
                channel: hit.snippet.channel_title,
                duration_secs: Some(duration),
                views: Some(detail.views()),
                uploaded_at: hit.snippet.published_at.map(|t| t.to_rfc3339()),
                id: Some(id),
            })
        })
        .collect()
}

fn video_info_from_item(item: VideoItem) -> Option<VideoInfo> {
    let video_id = VideoId::parse(&item.id).ok()?;
    let duration = item.duration_secs();
    let views = item.views();
    let snippet = item.snippet;
    Some(VideoInfo {
        video_id,
        title: snippet.title.unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
        artists: snippet.channel_title.unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
        duration,
        views,
        thumbnail: snippet
            .thumbnails
            .best()
            .unwrap_or_else(|| PLACEHOLDER_THUMBNAIL.to_string()),
        description: snippet.description.filter(|d| !d.is_empty()),
        published_at: snippet.published_at,
        channel_id: snippet.channel_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchOrder;
    use serde_json::json;

    fn search_response() -> ListResponse<SearchItem> {
        serde_json::from_value(json!({"items": [
            {"id": {"videoId": "aaaaaaaaaaa"}, "snippet": {
                "title": "Song A", "channelTitle": "Artist A",
                "publishedAt": "2024-01-02T03:04:05Z",
                "thumbnails": {"default": {"url": "d.jpg"}, "high": {"url": "h.jpg"}}
            }},
            {"id": {"videoId": "bbbbbbbbbbb"}, "snippet": {"title": "Funny #Shorts"}},
            {"id": {"videoId": "ccccccccccc"}, "snippet": {"title": "Intro"}},
            {"id": {"videoId": "ddddddddddd"}, "snippet": {"title": "No details"}},
            {"id": {}, "snippet": {"title": "Channel hit"}}
        ]}))
        .unwrap()
    }

    fn details_response() -> ListResponse<VideoItem> {
        serde_json::from_value(json!({"items": [
            {"id": "ccccccccccc", "contentDetails": {"duration": "PT12S"}},
            {"id": "aaaaaaaaaaa", "contentDetails": {"duration": "PT3M30S"},
             "statistics": {"viewCount": "4200"}},
            {"id": "bbbbbbbbbbb", "contentDetails": {"duration": "PT2M"}}
        ]}))
        .unwrap()
    }

    #[test]
    fn test_merge_filters_short_items() {
        let merged = merge_results(search_response().items, details_response().items);
        assert_eq!(merged.len(), 1);

        let video = &merged[0];
        assert_eq!(video.id.as_deref(), Some("aaaaaaaaaaa"));
        assert_eq!(video.duration_secs, Some(210));
        assert_eq!(video.views, Some(4200));
        assert_eq!(video.thumbnail.as_deref(), Some("h.jpg"));
        assert_eq!(video.uploaded_at.as_deref(), Some("2024-01-02T03:04:05+00:00"));
    }

    #[test]
    fn test_video_info_from_item() {
        let list: ListResponse<VideoItem> = serde_json::from_value(json!({"items": [{
            "id": "dQw4w9WgXcQ",
            "snippet": {"title": "Never Gonna Give You Up", "channelId": "UC1",
                        "description": "", "publishedAt": "2009-10-25T06:57:33Z"},
            "contentDetails": {"duration": "PT3M33S"},
            "statistics": {"viewCount": "100"}
        }]}))
        .unwrap();
        let info = list.items.into_iter().next().and_then(video_info_from_item).unwrap();
        assert_eq!(info.artists, UNKNOWN_ARTIST);
        assert_eq!(info.thumbnail, PLACEHOLDER_THUMBNAIL);
        assert_eq!(info.duration, 213);
        assert_eq!(info.channel_id.as_deref(), Some("UC1"));
        assert!(info.description.is_none());
    }

    #[test]
    fn test_empty_list_response() {
        let list: ListResponse<VideoItem> = serde_json::from_value(json!({})).unwrap();
        assert!(list.items.is_empty());
    }

    #[test]
    fn test_merge_without_details_is_empty() {
        assert!(merge_results(search_response().items, Vec::new()).is_empty());
    }

    fn backend() -> DataApiBackend {
        let config = YoutubeConfig {
            region: "GB".into(),
            request_timeout_secs: 1,
            ..Default::default()
        };
        DataApiBackend::new(reqwest::Client::new(), "key", &config)
    }

    #[test]
    fn test_search_params_carry_order_and_window() {
        let backend = backend();
        let plain = backend.search_params(&SearchQuery::new("lofi", 80));
        assert!(plain.contains(&("order", "relevance".to_string())));
        assert!(plain.contains(&("maxResults", "50".to_string())));
        assert!(plain.contains(&("regionCode", "GB".to_string())));
        assert!(!plain.iter().any(|(k, _)| *k == "publishedAfter"));

        let mut query = SearchQuery::new("top hits", 20);
        query.order = SearchOrder::ViewCount;
        query.published_after = "2026-01-01T00:00:00Z".parse().ok();
        let params = backend.search_params(&query);
        assert!(params.contains(&("order", "viewCount".to_string())));
        assert!(params.contains(&("publishedAfter", "2026-01-01T00:00:00Z".to_string())));
    }

    #[tokio::test]
    async fn test_silent_api_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let backend = backend().with_base_url(format!("http://{}", addr));
        let started = std::time::Instant::now();
        let err = backend.search(&SearchQuery::new("lofi", 5)).await.unwrap_err();
        assert!(matches!(err, SearchError::Http(ref e) if e.is_timeout()), "{err}");
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
