//! Error types for the streaming backend and player

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rejected client input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid video ID")]
    InvalidVideoId,

    #[error("{0} is required")]
    MissingParameter(&'static str),

    #[error("{name} must be at least {min} characters")]
    TooShort { name: &'static str, min: usize },
}

/// Search backend errors
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned status {0}")]
    Status(u16),

    #[error("Failed to parse upstream response: {0}")]
    Parse(String),

    #[error("Backend not configured: {0}")]
    NotConfigured(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No results")]
    Empty,
}

/// Failure of a single audio resolution strategy
#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned status {0}")]
    Status(u16),

    #[error("Failed to parse upstream response: {0}")]
    Parse(String),

    #[error("Video not playable: {0}")]
    Unplayable(String),

    #[error("No audio-only format available")]
    NoAudioFormat,

    #[error("No proxy instance configured")]
    NoInstances,

    #[error("Timed out after {0} ms")]
    Timeout(u64),
}

/// Failure of the whole audio resolution cascade
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("All {attempts} strategies failed")]
    Exhausted { attempts: usize },

    #[error("No strategies configured")]
    NoStrategies,
}

/// Local persistence errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to read store: {0}")]
    Read(String),

    #[error("Failed to write store: {0}")]
    Write(String),

    #[error("Invalid stored value for {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;
