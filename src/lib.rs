//! Reader-Crawler: a bounded, same-domain crawler on top of a reader proxy
//!
//! This crate fetches readable renderings of pages through an external
//! rendering proxy, extracts the links they contain, restricts them to the
//! seed's domain, and crawls an operator-selected subset with bounded
//! concurrency, retry, and persistence of results.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for crawler operations
#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Failed to fetch {url} after {attempts} attempts: {reason}")]
    FetchFailed {
        url: String,
        attempts: u32,
        reason: crawler::FetchFailure,
    },

    #[error("No URLs selected for crawling")]
    NoSelection,

    #[error("Cannot start {operation}: a crawl or retry is already running")]
    Busy { operation: &'static str },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Cannot resolve '{candidate}' against {base}: {reason}")]
    Malformed {
        base: String,
        candidate: String,
        reason: String,
    },
}

/// Result type alias for crawler operations
pub type Result<T> = std::result::Result<T, CrawlerError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{BatchReport, ContentFetcher, Coordinator, ReaderProxy};
pub use state::{CrawlEntry, CrawlStats, CrawlStatus, LinkCandidate};
pub use url::{is_same_domain, is_valid_http_url, resolve};
