//! Extraction strategies: read YouTube's own player data
//!
//! [`InnerTubeStrategy`] asks the player endpoint directly with a mobile
//! client context; [`WatchPageStrategy`] scrapes the same data out of the
//! watch page. Both then pick an audio-only format and either redirect to it
//! or relay it.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::format::{choose_audio_format, formats_from_player};
use super::range::ByteRange;
use super::{relay, AudioStrategy, Resolution};
use crate::constants::BROWSER_USER_AGENT;
use crate::error::StrategyError;
use crate::search::scrape::player_response_from_html;
use crate::tracks::VideoId;

const PLAYER_URL: &str = "https://www.youtube.com/youtubei/v1/player?prettyPrint=false";

/// Mobile client identity; its formats carry direct URLs
struct ClientContext {
    name: &'static str,
    name_id: u32,
    version: &'static str,
    user_agent: &'static str,
    android_sdk_version: u32,
}

const ANDROID_CLIENT: ClientContext = ClientContext {
    name: "ANDROID",
    name_id: 3,
    version: "19.44.38",
    user_agent: "com.google.android.youtube/19.44.38 (Linux; U; Android 14; en_US; Pixel 8) gzip",
    android_sdk_version: 34,
};

fn player_request_body(id: &VideoId, client: &ClientContext) -> Value {
    json!({
        "videoId": id.as_str(),
        "context": {
            "client": {
                "clientName": client.name,
                "clientVersion": client.version,
                "androidSdkVersion": client.android_sdk_version,
                "hl": "en",
                "gl": "US",
                "timeZone": "UTC",
                "utcOffsetMinutes": 0,
            }
        },
        "contentCheckOk": true,
        "racyCheckOk": true,
        "playbackContext": {
            "contentPlaybackContext": {"html5Preference": "HTML5_PREF_WANTS"}
        },
    })
}

/// Pick a format from `player` and redirect to it or relay it
async fn deliver(
    client: &reqwest::Client,
    player: &Value,
    redirect: bool,
    range: Option<ByteRange>,
) -> Result<Resolution, StrategyError> {
    let formats = formats_from_player(player)?;
    let format = choose_audio_format(&formats).ok_or(StrategyError::NoAudioFormat)?;
    let url = format.url.as_deref().ok_or(StrategyError::NoAudioFormat)?;
    tracing::debug!("Selected {} at {} bps", format.mime_type, format.bitrate);

    if redirect {
        return Ok(Resolution::Redirect(url.to_string()));
    }
    let stream = relay::fetch(client, url, range, format.base_mime(), format.content_length).await?;
    Ok(Resolution::Stream(stream))
}

pub struct InnerTubeStrategy {
    client: reqwest::Client,
    redirect: bool,
}

impl InnerTubeStrategy {
    pub fn new(client: reqwest::Client, redirect: bool) -> Self {
        Self { client, redirect }
    }

    async fn player(&self, id: &VideoId) -> Result<Value, StrategyError> {
        let itclient = &ANDROID_CLIENT;
        let response = self
            .client
            .post(PLAYER_URL)
            .header(reqwest::header::USER_AGENT, itclient.user_agent)
            .header("X-YouTube-Client-Name", itclient.name_id.to_string())
            .header("X-YouTube-Client-Version", itclient.version)
            .json(&player_request_body(id, itclient))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StrategyError::Status(response.status().as_u16()));
        }
        response
            .json()
            .await
            .map_err(|e| StrategyError::Parse(e.to_string()))
    }
}

#[async_trait]
impl AudioStrategy for InnerTubeStrategy {
    fn name(&self) -> &'static str {
        "innertube"
    }

    async fn resolve(
        &self,
        id: &VideoId,
        range: Option<ByteRange>,
    ) -> Result<Resolution, StrategyError> {
        let player = self.player(id).await?;
        deliver(&self.client, &player, self.redirect, range).await
    }
}

pub struct WatchPageStrategy {
    client: reqwest::Client,
    redirect: bool,
}

impl WatchPageStrategy {
    pub fn new(client: reqwest::Client, redirect: bool) -> Self {
        Self { client, redirect }
    }
}

#[async_trait]
impl AudioStrategy for WatchPageStrategy {
    fn name(&self) -> &'static str {
        "watch-page"
    }

    async fn resolve(
        &self,
        id: &VideoId,
        range: Option<ByteRange>,
    ) -> Result<Resolution, StrategyError> {
        let response = self
            .client
            .get(id.watch_url())
            .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(StrategyError::Status(response.status().as_u16()));
        }

        let html = response.text().await?;
        let player =
            player_response_from_html(&html).map_err(|e| StrategyError::Parse(e.to_string()))?;
        deliver(&self.client, &player, self.redirect, range).await
    }
}
