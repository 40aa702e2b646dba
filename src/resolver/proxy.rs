//! Proxy strategy: Piped-compatible API instances
//!
//! `GET {instance}/streams/{id}` lists proxied audio streams; the chosen one
//! is fetched through the same instance.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::format::{choose_audio_format, AudioFormat};
use super::range::ByteRange;
use super::{relay, AudioStrategy, Resolution};
use crate::error::StrategyError;
use crate::tracks::VideoId;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamsResponse {
    #[serde(default)]
    audio_streams: Vec<PipedAudioStream>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PipedAudioStream {
    url: Option<String>,
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    bitrate: u64,
    content_length: Option<i64>,
}

impl From<PipedAudioStream> for AudioFormat {
    fn from(stream: PipedAudioStream) -> Self {
        AudioFormat {
            url: stream.url.filter(|u| !u.is_empty()),
            mime_type: stream.mime_type,
            bitrate: stream.bitrate,
            content_length: stream.content_length.and_then(|n| u64::try_from(n).ok()),
        }
    }
}

pub struct ProxyStrategy {
    client: reqwest::Client,
    instances: Vec<String>,
    /// Bound on each instance so a dead one cannot starve the rest
    instance_timeout: Duration,
}

impl ProxyStrategy {
    pub fn new(client: reqwest::Client, instances: Vec<String>, instance_timeout: Duration) -> Self {
        Self {
            client,
            instances,
            instance_timeout,
        }
    }

    async fn try_instance(
        &self,
        instance: &str,
        id: &VideoId,
        range: Option<ByteRange>,
    ) -> Result<Resolution, StrategyError> {
        let url = format!("{}/streams/{}", instance.trim_end_matches('/'), id);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(StrategyError::Status(response.status().as_u16()));
        }

        let streams: StreamsResponse = response
            .json()
            .await
            .map_err(|e| StrategyError::Parse(e.to_string()))?;
        if let Some(error) = streams.error {
            return Err(StrategyError::Unplayable(error));
        }

        let formats: Vec<AudioFormat> = streams.audio_streams.into_iter().map(Into::into).collect();
        let format = choose_audio_format(&formats).ok_or(StrategyError::NoAudioFormat)?;
        let media_url = format.url.as_deref().ok_or(StrategyError::NoAudioFormat)?;

        let stream = relay::fetch(
            &self.client,
            media_url,
            range,
            format.base_mime(),
            format.content_length,
        )
        .await?;
        Ok(Resolution::Stream(stream))
    }
}

#[async_trait]
impl AudioStrategy for ProxyStrategy {
    fn name(&self) -> &'static str {
        "proxy"
    }

    async fn resolve(
        &self,
        id: &VideoId,
        range: Option<ByteRange>,
    ) -> Result<Resolution, StrategyError> {
        let mut last_error = StrategyError::NoInstances;
        for instance in &self.instances {
            let attempt = tokio::time::timeout(
                self.instance_timeout,
                self.try_instance(instance, id, range),
            );
            let outcome = match attempt.await {
                Ok(outcome) => outcome,
                Err(_) => Err(StrategyError::Timeout(self.instance_timeout.as_millis() as u64)),
            };
            match outcome {
                Ok(resolution) => return Ok(resolution),
                Err(e) => {
                    tracing::debug!("Proxy instance {} failed for {}: {}", instance, id, e);
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }
}
