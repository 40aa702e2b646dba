//! Audio resolution
//!
//! Turns a [`VideoId`] into something a client can play: either a URL to
//! redirect to or a byte stream to relay. Resolution runs an ordered list of
//! [`AudioStrategy`]s until one succeeds; each attempt is bounded by a
//! timeout and failures are logged, never surfaced.

pub mod extract;
pub mod format;
pub mod proxy;
pub mod range;
pub mod relay;

use async_trait::async_trait;
use std::time::Duration;

use crate::config::StreamConfig;
use crate::error::{ResolveError, StrategyError};
use crate::tracks::VideoId;

pub use extract::{InnerTubeStrategy, WatchPageStrategy};
pub use format::{choose_audio_format, AudioFormat};
pub use proxy::ProxyStrategy;
pub use range::{ByteRange, ContentRange};
pub use relay::{AudioStream, BodyStream, Delivery};

/// Outcome of a successful resolution
#[derive(Debug)]
pub enum Resolution {
    /// Send the client a 302 to this URL
    Redirect(String),
    /// Relay these bytes
    Stream(AudioStream),
}

/// One way of obtaining playable audio
#[async_trait]
pub trait AudioStrategy: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    async fn resolve(
        &self,
        id: &VideoId,
        range: Option<ByteRange>,
    ) -> Result<Resolution, StrategyError>;
}

/// Ordered fallback over strategies
pub struct Cascade {
    strategies: Vec<Box<dyn AudioStrategy>>,
    attempt_timeout: Duration,
}

impl Cascade {
    pub fn new(strategies: Vec<Box<dyn AudioStrategy>>, attempt_timeout: Duration) -> Self {
        Self {
            strategies,
            attempt_timeout,
        }
    }

    /// Proxy instances first (when configured), then InnerTube extraction,
    /// then the watch page.
    pub fn from_config(client: reqwest::Client, config: &StreamConfig) -> Self {
        let mut strategies: Vec<Box<dyn AudioStrategy>> = Vec::new();
        if !config.proxy_instances.is_empty() {
            strategies.push(Box::new(ProxyStrategy::new(
                client.clone(),
                config.proxy_instances.clone(),
                config.proxy_instance_timeout(),
            )));
        }
        strategies.push(Box::new(InnerTubeStrategy::new(client.clone(), config.redirect)));
        strategies.push(Box::new(WatchPageStrategy::new(client, config.redirect)));
        Self::new(strategies, config.attempt_timeout())
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Try each strategy in order and return the first success
    pub async fn resolve(
        &self,
        id: &VideoId,
        range: Option<ByteRange>,
    ) -> Result<Resolution, ResolveError> {
        if self.strategies.is_empty() {
            return Err(ResolveError::NoStrategies);
        }

        for strategy in &self.strategies {
            tracing::debug!("Resolving {} via {}", id, strategy.name());
            let attempt = tokio::time::timeout(self.attempt_timeout, strategy.resolve(id, range));
            let error = match attempt.await {
                Ok(Ok(resolution)) => {
                    tracing::info!("Resolved {} via {}", id, strategy.name());
                    return Ok(resolution);
                }
                Ok(Err(e)) => e,
                Err(_) => StrategyError::Timeout(self.attempt_timeout.as_millis() as u64),
            };
            tracing::warn!("Strategy {} failed for {}: {}", strategy.name(), id, error);
        }

        Err(ResolveError::Exhausted {
            attempts: self.strategies.len(),
        })
    }
}
