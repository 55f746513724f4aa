//! Reader-proxy fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client for the rendering proxy
//! - Addressing a target page through the proxy
//! - Fixed-delay retry of failed attempts
//! - Error classification

use crate::config::{CrawlerConfig, ProxyConfig};
use crate::CrawlerError;
use reqwest::Client;
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Why a single fetch attempt failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// The proxy answered with a non-success status
    Status {
        /// The HTTP status code
        status_code: u16,
    },

    /// The request never produced a usable response (connect, timeout, body read)
    Transport {
        /// Error description
        message: String,
    },
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status { status_code } => write!(f, "HTTP {}", status_code),
            Self::Transport { message } => write!(f, "{}", message),
        }
    }
}

/// A single-attempt source of page content
///
/// Retry lives in [`ContentFetcher`]; implementations make exactly one attempt.
pub trait PageSource {
    /// Fetches the rendered content of `url` once
    fn fetch_page(&self, url: &str) -> impl Future<Output = Result<String, FetchFailure>> + Send;
}

/// Fetches pages through the external rendering proxy
#[derive(Debug, Clone)]
pub struct ReaderProxy {
    client: Client,
    base_url: String,
}

impl ReaderProxy {
    /// Creates a proxy client from configuration
    ///
    /// # Arguments
    ///
    /// * `config` - The proxy configuration
    ///
    /// # Returns
    ///
    /// * `Ok(ReaderProxy)` - Successfully built HTTP client
    /// * `Err(reqwest::Error)` - Failed to build client
    pub fn new(config: &ProxyConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Builds the proxy URL for a target page
    ///
    /// The target is percent-encoded as a single path segment.
    ///
    /// # Example
    ///
    /// ```
    /// use reader_crawler::config::ProxyConfig;
    /// use reader_crawler::crawler::ReaderProxy;
    ///
    /// let proxy = ReaderProxy::new(&ProxyConfig::default()).unwrap();
    /// assert_eq!(
    ///     proxy.request_url("https://ex.com/a?b=1"),
    ///     "https://r.jina.ai/https%3A%2F%2Fex.com%2Fa%3Fb%3D1"
    /// );
    /// ```
    pub fn request_url(&self, target: &str) -> String {
        format!("{}/{}", self.base_url, urlencoding::encode(target))
    }
}

impl PageSource for ReaderProxy {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchFailure> {
        let request_url = self.request_url(url);
        tracing::debug!("Fetching {} via {}", url, request_url);

        let response = self
            .client
            .get(&request_url)
            .send()
            .await
            .map_err(classify_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::Status {
                status_code: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(classify_error)?;
        tracing::debug!("Content length for {}: {} characters", url, body.len());
        Ok(body)
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The proxy configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &ProxyConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

fn classify_error(e: reqwest::Error) -> FetchFailure {
    let message = if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        format!("Connection failed: {}", e)
    } else {
        e.to_string()
    };
    FetchFailure::Transport { message }
}

/// Fixed-delay retry schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Wait between consecutive attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Builds the retry schedule from crawler configuration
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            delay: Duration::from_millis(config.retry_delay_ms),
        }
    }

    /// Total attempts including the first
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

/// Fetches page content with bounded, sequential retry
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | HTTP 2xx | Return body |
/// | Any other status | Wait `delay`, retry |
/// | Transport error | Wait `delay`, retry |
/// | Retries exhausted | `CrawlerError::FetchFailed` with the last failure |
pub struct ContentFetcher<S> {
    source: S,
    policy: RetryPolicy,
}

impl<S: PageSource> ContentFetcher<S> {
    pub fn new(source: S, policy: RetryPolicy) -> Self {
        Self { source, policy }
    }

    /// The underlying single-attempt source
    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Fetches `url`, retrying failed attempts with a fixed delay
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The page content
    /// * `Err(CrawlerError::FetchFailed)` - Every attempt failed
    pub async fn fetch(&self, url: &str) -> Result<String, CrawlerError> {
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 1;

        loop {
            match self.source.fetch_page(url).await {
                Ok(content) => return Ok(content),
                Err(failure) if attempt < max_attempts => {
                    tracing::warn!(
                        "Fetch attempt {}/{} for {} failed: {}; retrying in {:?}",
                        attempt,
                        max_attempts,
                        url,
                        failure,
                        self.policy.delay
                    );
                    tokio::time::sleep(self.policy.delay).await;
                    attempt += 1;
                }
                Err(failure) => {
                    tracing::error!(
                        "Giving up on {} after {} attempts: {}",
                        url,
                        attempt,
                        failure
                    );
                    return Err(CrawlerError::FetchFailed {
                        url: url.to_string(),
                        attempts: attempt,
                        reason: failure,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Fails a fixed number of times, then succeeds
    struct FlakySource {
        failures: u32,
        calls: AtomicU32,
    }

    impl FlakySource {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
            }
        }
    }

    impl PageSource for FlakySource {
        async fn fetch_page(&self, _url: &str) -> Result<String, FetchFailure> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                Err(FetchFailure::Status { status_code: 503 })
            } else {
                Ok("content".to_string())
            }
        }
    }

    fn proxy_for(server: &MockServer) -> ReaderProxy {
        let config = ProxyConfig {
            base_url: server.uri(),
            ..ProxyConfig::default()
        };
        ReaderProxy::new(&config).unwrap()
    }

    fn no_wait(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            delay: Duration::ZERO,
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.max_attempts(), 6);
        assert_eq!(policy.delay, Duration::from_secs(5));
    }

    #[test]
    fn test_request_url_encodes_target() {
        let config = ProxyConfig {
            base_url: "https://proxy.test/".to_string(),
            ..ProxyConfig::default()
        };
        let proxy = ReaderProxy::new(&config).unwrap();
        assert_eq!(
            proxy.request_url("https://ex.com/a b#c"),
            "https://proxy.test/https%3A%2F%2Fex.com%2Fa%20b%23c"
        );
    }

    #[test]
    fn test_failure_display() {
        assert_eq!(
            FetchFailure::Status { status_code: 502 }.to_string(),
            "HTTP 502"
        );
        assert_eq!(
            FetchFailure::Transport {
                message: "Request timeout".to_string()
            }
            .to_string(),
            "Request timeout"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_then_succeed_counts_calls_and_delays() {
        let fetcher = ContentFetcher::new(FlakySource::new(3), RetryPolicy::default());

        let start = tokio::time::Instant::now();
        let content = fetcher.fetch("https://ex.com/").await.unwrap();
        let waited = start.elapsed();

        assert_eq!(content, "content");
        assert_eq!(fetcher.source().calls.load(Ordering::SeqCst), 4);
        // Three fixed delays of five seconds, no backoff
        assert_eq!(waited, Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_surface_last_failure() {
        let fetcher = ContentFetcher::new(FlakySource::new(u32::MAX), RetryPolicy::default());

        let start = tokio::time::Instant::now();
        let result = fetcher.fetch("https://ex.com/down").await;

        match result {
            Err(CrawlerError::FetchFailed {
                url,
                attempts,
                reason,
            }) => {
                assert_eq!(url, "https://ex.com/down");
                assert_eq!(attempts, 6);
                assert_eq!(reason, FetchFailure::Status { status_code: 503 });
            }
            other => panic!("expected FetchFailed, got {:?}", other),
        }
        assert_eq!(fetcher.source().calls.load(Ordering::SeqCst), 6);
        assert_eq!(start.elapsed(), Duration::from_secs(25));
    }

    #[tokio::test]
    async fn test_first_attempt_success_does_not_wait() {
        let fetcher = ContentFetcher::new(FlakySource::new(0), RetryPolicy::default());
        let start = std::time::Instant::now();
        fetcher.fetch("https://ex.com/").await.unwrap();
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(fetcher.source().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_proxy_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/https%3A%2F%2Fex.com%2Fa"))
            .respond_with(ResponseTemplate::new(200).set_body_string("# Title\n[B](/b)"))
            .expect(1)
            .mount(&server)
            .await;

        let proxy = proxy_for(&server);
        let body = proxy.fetch_page("https://ex.com/a").await.unwrap();
        assert_eq!(body, "# Title\n[B](/b)");
    }

    #[tokio::test]
    async fn test_proxy_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let proxy = proxy_for(&server);
        let result = proxy.fetch_page("https://ex.com/a").await;
        assert_eq!(result, Err(FetchFailure::Status { status_code: 429 }));
    }

    #[tokio::test]
    async fn test_fetcher_retries_against_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let fetcher = ContentFetcher::new(proxy_for(&server), no_wait(2));
        let result = fetcher.fetch("https://ex.com/a").await;

        assert!(matches!(
            result,
            Err(CrawlerError::FetchFailed { attempts: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let config = ProxyConfig {
            // Nothing listens on port 9 of localhost in the test environment
            base_url: "http://127.0.0.1:9".to_string(),
            ..ProxyConfig::default()
        };
        let fetcher = ContentFetcher::new(ReaderProxy::new(&config).unwrap(), no_wait(0));

        let result = fetcher.fetch("https://ex.com/a").await;
        assert!(matches!(
            result,
            Err(CrawlerError::FetchFailed {
                attempts: 1,
                reason: FetchFailure::Transport { .. },
                ..
            })
        ));
    }
}
