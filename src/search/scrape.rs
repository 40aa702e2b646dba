//! Scraping backend: YouTube results and watch pages
//!
//! Needs no credentials. Result pages embed `ytInitialData`, watch pages
//! embed `ytInitialPlayerResponse`; both are parsed as loose JSON.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use super::page::{best_thumbnail, collect_renderers, extract_assigned_json, text_of};
use super::{SearchBackend, SearchQuery};
use crate::config::YoutubeConfig;
use crate::constants::BROWSER_USER_AGENT;
use crate::error::SearchError;
use crate::tracks::normalize::{
    parse_clock_duration, parse_view_count, PLACEHOLDER_THUMBNAIL, UNKNOWN_ARTIST, UNKNOWN_TITLE,
};
use crate::tracks::{RawVideo, VideoId, VideoInfo};

const RESULTS_URL: &str = "https://www.youtube.com/results";

/// `sp` filter restricting results to videos
const VIDEO_FILTER: &str = "EgIQAQ%3D%3D";

pub struct ScrapeBackend {
    client: reqwest::Client,
    region: String,
    language: String,
    timeout: std::time::Duration,
}

impl ScrapeBackend {
    pub fn new(client: reqwest::Client, config: &YoutubeConfig) -> Self {
        Self {
            client,
            region: config.region.clone(),
            language: config.language.clone(),
            timeout: config.request_timeout(),
        }
    }

    async fn get_page(&self, url: &str, query: &[(&str, &str)]) -> Result<String, SearchError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .query(&[("hl", self.language.as_str()), ("gl", self.region.as_str())])
            .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::Status(response.status().as_u16()));
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl SearchBackend for ScrapeBackend {
    fn name(&self) -> &'static str {
        "scrape"
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<RawVideo>, SearchError> {
        let html = self
            .get_page(
                RESULTS_URL,
                &[("search_query", query.text.as_str()), ("sp", VIDEO_FILTER)],
            )
            .await?;
        let mut videos = parse_results_page(&html)?;
        videos.truncate(query.limit);
        tracing::debug!("Scraped {} results for '{}'", videos.len(), query.text);
        Ok(videos)
    }

    async fn video_info(&self, id: &VideoId) -> Result<Option<VideoInfo>, SearchError> {
        let html = self
            .get_page("https://www.youtube.com/watch", &[("v", id.as_str())])
            .await?;
        let player = player_response_from_html(&html)?;
        Ok(video_info_from_player(&player))
    }
}

/// Parse the `ytInitialData` of a results page into raw videos
pub fn parse_results_page(html: &str) -> Result<Vec<RawVideo>, SearchError> {
    let data = extract_assigned_json(html, "ytInitialData")
        .ok_or_else(|| SearchError::Parse("ytInitialData not found".into()))?;

    let mut renderers = Vec::new();
    collect_renderers(&data, "videoRenderer", &mut renderers);
    Ok(renderers.into_iter().map(raw_from_renderer).collect())
}

fn raw_from_renderer(renderer: &Value) -> RawVideo {
    let channel = renderer
        .get("ownerText")
        .or_else(|| renderer.get("longBylineText"))
        .and_then(text_of);

    RawVideo {
        id: renderer.get("videoId").and_then(Value::as_str).map(str::to_string),
        title: renderer.get("title").and_then(text_of),
        channel,
        thumbnail: renderer.get("thumbnail").and_then(best_thumbnail),
        duration_secs: renderer
            .get("lengthText")
            .and_then(text_of)
            .and_then(|t| parse_clock_duration(&t)),
        views: renderer
            .get("viewCountText")
            .and_then(text_of)
            .and_then(|t| parse_view_count(&t)),
        uploaded_at: renderer.get("publishedTimeText").and_then(text_of),
    }
}

/// The `ytInitialPlayerResponse` object of a watch page
pub fn player_response_from_html(html: &str) -> Result<Value, SearchError> {
    extract_assigned_json(html, "ytInitialPlayerResponse")
        .ok_or_else(|| SearchError::Parse("ytInitialPlayerResponse not found".into()))
}

/// Build [`VideoInfo`] from a player response; `None` if upstream reports
/// the video as missing.
pub fn video_info_from_player(player: &Value) -> Option<VideoInfo> {
    let details = player.get("videoDetails")?;
    let video_id = VideoId::parse(details.get("videoId")?.as_str()?).ok()?;

    let str_field = |key: &str| details.get(key).and_then(Value::as_str).map(str::to_string);
    let num_field = |key: &str| {
        details
            .get(key)
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0)
    };

    let published_at = player
        .pointer("/microformat/playerMicroformatRenderer/publishDate")
        .and_then(Value::as_str)
        .and_then(parse_publish_date);

    Some(VideoInfo {
        video_id,
        title: str_field("title").unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
        artists: str_field("author").unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
        duration: num_field("lengthSeconds"),
        views: num_field("viewCount"),
        thumbnail: details
            .get("thumbnail")
            .and_then(best_thumbnail)
            .unwrap_or_else(|| PLACEHOLDER_THUMBNAIL.to_string()),
        description: str_field("shortDescription").filter(|d| !d.is_empty()),
        published_at,
        channel_id: str_field("channelId"),
    })
}

/// Accepts both RFC 3339 timestamps and bare `YYYY-MM-DD` dates
fn parse_publish_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn results_html() -> String {
        let data = json!({
            "contents": {"sectionListRenderer": {"contents": [{
                "itemSectionRenderer": {"contents": [
                    {"videoRenderer": {
                        "videoId": "dQw4w9WgXcQ",
                        "title": {"runs": [{"text": "Never Gonna Give You Up"}]},
                        "ownerText": {"runs": [{"text": "Rick Astley"}]},
                        "thumbnail": {"thumbnails": [
                            {"url": "https://i.ytimg.com/s.jpg", "width": 120},
                            {"url": "https://i.ytimg.com/l.jpg", "width": 720}
                        ]},
                        "lengthText": {"simpleText": "3:33"},
                        "viewCountText": {"simpleText": "1,500,000,000 views"},
                        "publishedTimeText": {"simpleText": "14 years ago"}
                    }},
                    {"adSlotRenderer": {}},
                    {"videoRenderer": {
                        "videoId": "9bZkp7q19f0",
                        "title": {"simpleText": "Gangnam Style"}
                    }}
                ]}
            }]}}
        });
        format!("<html><script>var ytInitialData = {};</script></html>", data)
    }

    #[test]
    fn test_parse_results_page() {
        let videos = parse_results_page(&results_html()).unwrap();
        assert_eq!(videos.len(), 2);

        let first = &videos[0];
        assert_eq!(first.id.as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(first.channel.as_deref(), Some("Rick Astley"));
        assert_eq!(first.thumbnail.as_deref(), Some("https://i.ytimg.com/l.jpg"));
        assert_eq!(first.duration_secs, Some(213));
        assert_eq!(first.views, Some(1_500_000_000));

        let second = videos[1].clone().into_track().unwrap();
        assert_eq!(second.artists, "Unknown Artist");
        assert_eq!(second.duration, 0);
    }

    #[test]
    fn test_results_page_without_data() {
        assert!(matches!(
            parse_results_page("<html></html>"),
            Err(SearchError::Parse(_))
        ));
    }

    #[test]
    fn test_video_info_from_player() {
        let player = json!({
            "playabilityStatus": {"status": "OK"},
            "videoDetails": {
                "videoId": "dQw4w9WgXcQ",
                "title": "Never Gonna Give You Up",
                "author": "Rick Astley",
                "lengthSeconds": "213",
                "viewCount": "1500000000",
                "channelId": "UCuAXFkgsw1L7xaCfnd5JJOw",
                "shortDescription": "",
                "thumbnail": {"thumbnails": [{"url": "https://i.ytimg.com/x.jpg", "width": 480}]}
            },
            "microformat": {"playerMicroformatRenderer": {"publishDate": "2009-10-24"}}
        });
        let info = video_info_from_player(&player).unwrap();
        assert_eq!(info.duration, 213);
        assert_eq!(info.views, 1_500_000_000);
        assert_eq!(info.related_query(), "Never Gonna Give You Up Rick Astley");
        assert!(info.description.is_none());
        assert_eq!(info.published_at.unwrap().to_rfc3339(), "2009-10-24T00:00:00+00:00");

        let missing = json!({"playabilityStatus": {"status": "ERROR"}});
        assert!(video_info_from_player(&missing).is_none());
    }

    #[test]
    fn test_player_without_thumbnail_gets_placeholder() {
        let player = json!({
            "videoDetails": {"videoId": "dQw4w9WgXcQ", "lengthSeconds": "60"}
        });
        let info = video_info_from_player(&player).unwrap();
        assert_eq!(info.thumbnail, PLACEHOLDER_THUMBNAIL);
        assert_eq!(info.title, UNKNOWN_TITLE);
        assert_eq!(info.artists, UNKNOWN_ARTIST);
    }
}
