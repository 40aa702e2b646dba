//! The common track record shared by every handler and the player

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

use crate::error::ValidationError;

static VIDEO_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]{11}$").expect("static pattern"));

/// An 11-character YouTube video identifier.
///
/// Only constructible from strings matching `^[a-zA-Z0-9_-]{11}$`, so every
/// handler holding one may hit the network without re-validating.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VideoId(String);

impl VideoId {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        if VIDEO_ID_PATTERN.is_match(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(ValidationError::InvalidVideoId)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical watch page URL
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl TryFrom<String> for VideoId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<VideoId> for String {
    fn from(id: VideoId) -> Self {
        id.0
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A playable item derived from a video. Identity is `video_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub video_id: VideoId,
    pub title: String,
    pub artists: String,
    pub thumbnail: String,
    /// Duration in seconds
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub views: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<String>,
}

impl Track {
    /// Query used to look up tracks similar to this one
    pub fn related_query(&self) -> String {
        format!("{} {}", self.title, self.artists)
    }
}

/// Detailed metadata for a single video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    pub video_id: VideoId,
    pub title: String,
    pub artists: String,
    pub duration: u64,
    pub views: u64,
    pub thumbnail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
}

impl VideoInfo {
    pub fn related_query(&self) -> String {
        format!("{} {}", self.title, self.artists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_video_id_accepts_valid() {
        let id = VideoId::parse("dQw4w9WgXcQ").unwrap();
        assert_eq!(id.as_str(), "dQw4w9WgXcQ");
        assert_eq!(id.watch_url(), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert!(VideoId::parse("a-b_c-d_e-f").is_ok());
    }

    #[test]
    fn test_video_id_rejects_invalid() {
        for raw in ["", "short", "dQw4w9WgXcQQ", "dQw4w9WgXc!", "dQw4w9 WgXc", "../../etc/p"] {
            assert_eq!(VideoId::parse(raw), Err(ValidationError::InvalidVideoId), "{raw}");
        }
    }

    #[test]
    fn test_track_json_shape() {
        let track = Track {
            video_id: VideoId::parse("dQw4w9WgXcQ").unwrap(),
            title: "Never Gonna Give You Up".into(),
            artists: "Rick Astley".into(),
            thumbnail: "https://i.ytimg.com/vi/dQw4w9WgXcQ/hq.jpg".into(),
            duration: 213,
            views: 1_000,
            uploaded_at: None,
        };
        let json = serde_json::to_value(&track).unwrap();
        assert_eq!(json["videoId"], "dQw4w9WgXcQ");
        assert_eq!(json["duration"], 213);
        assert!(json.get("uploadedAt").is_none());

        let bad = serde_json::json!({
            "videoId": "nope",
            "title": "x",
            "artists": "y",
            "thumbnail": "z",
        });
        assert!(serde_json::from_value::<Track>(bad).is_err());
    }

    proptest! {
        #[test]
        fn prop_wrong_length_is_rejected(raw in "[a-zA-Z0-9_-]{0,10}|[a-zA-Z0-9_-]{12,20}") {
            prop_assert!(VideoId::parse(&raw).is_err());
        }

        #[test]
        fn prop_pattern_is_accepted(raw in "[a-zA-Z0-9_-]{11}") {
            prop_assert!(VideoId::parse(&raw).is_ok());
        }
    }
}
