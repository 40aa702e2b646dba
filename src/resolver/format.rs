//! Audio format parsing and selection

use serde_json::Value;

use crate::error::StrategyError;

/// A downloadable media format
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AudioFormat {
    /// Direct URL; absent for signature-protected formats
    pub url: Option<String>,
    pub mime_type: String,
    pub bitrate: u64,
    pub content_length: Option<u64>,
}

impl AudioFormat {
    pub fn is_audio_only(&self) -> bool {
        self.mime_type.starts_with("audio/")
    }

    pub fn is_mp4(&self) -> bool {
        let base = self.base_mime();
        base.ends_with("/mp4") || base.ends_with("/m4a")
    }

    /// MIME type without codec parameters
    pub fn base_mime(&self) -> &str {
        self.mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
    }
}

/// Best playable audio-only format: mp4 first, then highest bitrate
pub fn choose_audio_format(formats: &[AudioFormat]) -> Option<&AudioFormat> {
    formats
        .iter()
        .filter(|f| f.is_audio_only() && f.url.is_some())
        .max_by_key(|f| (f.is_mp4(), f.bitrate))
}

/// Adaptive formats of an InnerTube player response.
///
/// Fails when upstream reports the video as unplayable.
pub fn formats_from_player(player: &Value) -> Result<Vec<AudioFormat>, StrategyError> {
    let status = player
        .pointer("/playabilityStatus/status")
        .and_then(Value::as_str)
        .unwrap_or("UNKNOWN");
    if status != "OK" {
        let reason = player
            .pointer("/playabilityStatus/reason")
            .and_then(Value::as_str)
            .unwrap_or("unknown reason");
        return Err(StrategyError::Unplayable(format!("{} ({})", status, reason)));
    }

    let formats = player
        .pointer("/streamingData/adaptiveFormats")
        .and_then(Value::as_array)
        .ok_or_else(|| StrategyError::Parse("missing adaptiveFormats".into()))?;

    Ok(formats
        .iter()
        .map(|f| AudioFormat {
            url: f.get("url").and_then(Value::as_str).map(str::to_string),
            mime_type: f
                .get("mimeType")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            bitrate: f.get("bitrate").and_then(Value::as_u64).unwrap_or(0),
            content_length: f
                .get("contentLength")
                .and_then(Value::as_str)
                .and_then(|s| s.parse().ok()),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn format(mime: &str, bitrate: u64, url: bool) -> AudioFormat {
        AudioFormat {
            url: url.then(|| format!("https://cdn/{}", bitrate)),
            mime_type: mime.to_string(),
            bitrate,
            content_length: None,
        }
    }

    #[test]
    fn test_prefers_mp4_then_bitrate() {
        let formats = vec![
            format("audio/webm; codecs=\"opus\"", 160_000, true),
            format("audio/mp4; codecs=\"mp4a.40.2\"", 128_000, true),
            format("audio/mp4; codecs=\"mp4a.40.5\"", 48_000, true),
            format("video/mp4; codecs=\"avc1\"", 900_000, true),
        ];
        let best = choose_audio_format(&formats).unwrap();
        assert_eq!(best.bitrate, 128_000);
        assert_eq!(best.base_mime(), "audio/mp4");

        let webm_only = vec![
            format("audio/webm", 70_000, true),
            format("audio/webm", 160_000, true),
            format("audio/webm", 999_000, false),
        ];
        assert_eq!(choose_audio_format(&webm_only).unwrap().bitrate, 160_000);
    }

    #[test]
    fn test_no_audio_only_format() {
        let formats = vec![format("video/mp4", 500_000, true), format("audio/mp4", 1, false)];
        assert!(choose_audio_format(&formats).is_none());
    }

    #[test]
    fn test_formats_from_player() {
        let player = json!({
            "playabilityStatus": {"status": "OK"},
            "streamingData": {"adaptiveFormats": [
                {"itag": 140, "url": "https://cdn/140", "mimeType": "audio/mp4; codecs=\"mp4a.40.2\"",
                 "bitrate": 130000, "contentLength": "3433514"},
                {"itag": 251, "signatureCipher": "s=...", "mimeType": "audio/webm; codecs=\"opus\"",
                 "bitrate": 140000}
            ]}
        });
        let formats = formats_from_player(&player).unwrap();
        assert_eq!(formats.len(), 2);
        assert_eq!(formats[0].content_length, Some(3_433_514));
        assert!(formats[1].url.is_none());

        let blocked = json!({"playabilityStatus": {"status": "LOGIN_REQUIRED", "reason": "Sign in"}});
        assert!(matches!(
            formats_from_player(&blocked),
            Err(StrategyError::Unplayable(msg)) if msg.contains("LOGIN_REQUIRED")
        ));
        assert!(matches!(
            formats_from_player(&json!({"playabilityStatus": {"status": "OK"}})),
            Err(StrategyError::Parse(_))
        ));
    }
}
