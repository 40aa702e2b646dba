//! Mapping heterogeneous backend results into [`Track`]s
//!
//! Backends report whatever their upstream gives them; everything here is
//! lenient and falls back to placeholders instead of failing.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use super::track::{Track, VideoId};
use crate::constants::MAX_RESULT_LIMIT;

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const PLACEHOLDER_THUMBNAIL: &str = "/placeholder-music.jpg";

static ISO8601_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?$").expect("static pattern")
});

/// A search hit as reported by a backend, before normalization
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawVideo {
    pub id: Option<String>,
    pub title: Option<String>,
    pub channel: Option<String>,
    pub thumbnail: Option<String>,
    pub duration_secs: Option<u64>,
    pub views: Option<u64>,
    pub uploaded_at: Option<String>,
}

impl RawVideo {
    /// Convert into a track, or `None` when the id is missing or malformed
    pub fn into_track(self) -> Option<Track> {
        let video_id = VideoId::parse(self.id.as_deref()?.trim()).ok()?;
        Some(Track {
            video_id,
            title: non_empty(self.title).unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            artists: non_empty(self.channel).unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
            thumbnail: non_empty(self.thumbnail)
                .unwrap_or_else(|| PLACEHOLDER_THUMBNAIL.to_string()),
            duration: self.duration_secs.unwrap_or(0),
            views: self.views.unwrap_or(0),
            uploaded_at: non_empty(self.uploaded_at),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Normalize, drop invalid ids, deduplicate by `video_id` (first wins) and
/// clip to `limit`.
pub fn normalize(raw: impl IntoIterator<Item = RawVideo>, limit: usize) -> Vec<Track> {
    dedupe(raw.into_iter().filter_map(RawVideo::into_track))
        .into_iter()
        .take(limit)
        .collect()
}

/// Keep the first occurrence of every `video_id`
pub fn dedupe(tracks: impl IntoIterator<Item = Track>) -> Vec<Track> {
    let mut seen = HashSet::new();
    tracks
        .into_iter()
        .filter(|t| seen.insert(t.video_id.clone()))
        .collect()
}

/// Parse a `limit` query value: unparsable → default, then clamp to `1..=MAX`.
pub fn clamp_limit(raw: Option<&str>, default: usize) -> usize {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .map(|n| n.clamp(1, MAX_RESULT_LIMIT as i64) as usize)
        .unwrap_or(default)
        .clamp(1, MAX_RESULT_LIMIT)
}

/// `"3:45"` / `"1:02:03"` → seconds. Values past `u64` are not durations.
pub fn parse_clock_duration(text: &str) -> Option<u64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    text.split(':').try_fold(0u64, |acc, part| {
        let n = part.trim().parse::<u64>().ok()?;
        acc.checked_mul(60)?.checked_add(n)
    })
}

/// ISO-8601 `PT#H#M#S` → seconds, saturating; anything else → 0
pub fn parse_iso8601_duration(text: &str) -> u64 {
    let Some(caps) = ISO8601_DURATION.captures(text.trim()) else {
        return 0;
    };
    let part = |i: usize| -> u64 {
        caps.get(i)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };
    part(1)
        .saturating_mul(3600)
        .saturating_add(part(2).saturating_mul(60))
        .saturating_add(part(3))
}

/// `"1,234,567 views"` → 1234567. Abbreviated counts (`"1.2M views"`) are
/// expanded.
pub fn parse_view_count(text: &str) -> Option<u64> {
    let token = text.split_whitespace().next()?.replace(',', "");
    if let Ok(n) = token.parse::<u64>() {
        return Some(n);
    }
    let (number, multiplier) = match token.chars().last()? {
        'K' | 'k' => (&token[..token.len() - 1], 1_000f64),
        'M' | 'm' => (&token[..token.len() - 1], 1_000_000f64),
        'B' | 'b' => (&token[..token.len() - 1], 1_000_000_000f64),
        _ => return None,
    };
    number.parse::<f64>().ok().map(|n| (n * multiplier) as u64)
}
