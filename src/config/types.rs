use crate::output::ExportFormat;
use serde::Deserialize;

/// Main configuration structure for the reader crawler
///
/// Every section may be omitted from the file; defaults apply.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of fetches in flight at once (1-10)
    #[serde(rename = "concurrency-limit")]
    pub concurrency_limit: usize,

    /// Retries after the first failed attempt
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Fixed wait between attempts (milliseconds)
    #[serde(rename = "retry-delay-ms")]
    pub retry_delay_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: 1,
            max_retries: 5,
            retry_delay_ms: 5000,
        }
    }
}

/// Rendering proxy configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Base endpoint; the encoded target URL is appended as a path segment
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            base_url: "https://r.jina.ai".to_string(),
            request_timeout_secs: 60,
            user_agent: format!("reader-crawler/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Default export format
    #[serde(rename = "download-format")]
    pub download_format: ExportFormat,

    /// Export file path without extension
    #[serde(rename = "export-path")]
    pub export_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: "./reader-crawler.db".to_string(),
            download_format: ExportFormat::Json,
            export_path: "./crawled_data".to_string(),
        }
    }
}
