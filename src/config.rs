//! Application configuration
//!
//! Layered: built-in defaults, then an optional TOML file, then environment
//! overrides.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::*;
use crate::error::ConfigError;

/// Which search capability backs the JSON handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// Scrape YouTube's results page
    #[default]
    Scrape,
    /// YouTube Data API v3 (needs an API key)
    DataApi,
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub youtube: YoutubeConfig,
    pub stream: StreamConfig,
    pub cache: CacheConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub http_port: u16,
    /// Directory with a prebuilt front end, served at `/` when set
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            http_port: DEFAULT_HTTP_PORT,
            static_dir: None,
        }
    }
}

/// Search backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YoutubeConfig {
    pub backend: BackendKind,
    pub api_key: Option<String>,
    /// `gl` parameter for upstream requests
    pub region: String,
    /// `hl` parameter for upstream requests
    pub language: String,
    pub request_timeout_secs: u64,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Scrape,
            api_key: None,
            region: "US".to_string(),
            language: "en".to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl YoutubeConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Audio resolution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Piped-compatible API instances, tried in order
    pub proxy_instances: Vec<String>,
    pub attempt_timeout_secs: u64,
    /// Redirect clients to the upstream media URL instead of relaying bytes
    pub redirect: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            proxy_instances: DEFAULT_PROXY_INSTANCES.iter().map(|s| s.to_string()).collect(),
            attempt_timeout_secs: DEFAULT_ATTEMPT_TIMEOUT_SECS,
            redirect: false,
        }
    }
}

impl StreamConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    /// Share of the attempt budget each proxy instance gets
    pub fn proxy_instance_timeout(&self) -> Duration {
        let instances = self.proxy_instances.len().max(1) as u32;
        (self.attempt_timeout() / instances).max(Duration::from_secs(1))
    }
}

/// Memoization windows
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub trending_ttl_secs: u64,
    pub search_ttl_secs: u64,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            trending_ttl_secs: DEFAULT_TRENDING_TTL_SECS,
            search_ttl_secs: DEFAULT_SEARCH_TTL_SECS,
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
        }
    }
}

impl CacheConfig {
    pub fn trending_ttl(&self) -> Duration {
        Duration::from_secs(self.trending_ttl_secs)
    }

    pub fn search_ttl(&self) -> Duration {
        Duration::from_secs(self.search_ttl_secs)
    }
}

impl AppConfig {
    /// Default config file location (`<config dir>/kabuso/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from `path` if given, else from the default location if it
    /// exists, else defaults. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content, &path.display().to_string())
    }

    pub fn from_toml(content: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })
    }

    /// Apply environment overrides using `lookup` as the variable source
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("YOUTUBE_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.youtube.api_key = Some(key.trim().to_string());
        }
        if let Some(backend) = lookup("KABUSO_BACKEND") {
            self.youtube.backend = match backend.trim() {
                "scrape" => BackendKind::Scrape,
                "data-api" => BackendKind::DataApi,
                other => {
                    return Err(ConfigError::InvalidValue {
                        key: "KABUSO_BACKEND",
                        value: other.to_string(),
                    })
                }
            };
        }
        if let Some(instance) = lookup("KABUSO_PROXY_INSTANCE").filter(|i| !i.trim().is_empty()) {
            self.stream.proxy_instances = instance
                .split(',')
                .map(|s| s.trim().trim_end_matches('/').to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(bind) = lookup("KABUSO_BIND") {
            self.server.bind_address = bind;
        }
        if let Some(port) = lookup("KABUSO_PORT") {
            self.server.http_port = port.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "KABUSO_PORT",
                value: port.clone(),
            })?;
        }
        if lookup("VERCEL").as_deref() == Some("1") {
            self.stream.redirect = true;
        }
        Ok(())
    }
}
