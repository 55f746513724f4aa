//! Crawler coordinator - session orchestration logic
//!
//! This module contains the operations that drive a crawl session:
//! - Fetching the seed page and building the initial frontier
//! - Crawling the operator-selected subset of the frontier
//! - Retrying only the URLs that ended in error
//! - Folding links discovered on every fetched page back into the frontier
//! - Handing completed results to the persistence layer

use crate::config::Config;
use crate::crawler::extractor::extract_links;
use crate::crawler::fetcher::{ContentFetcher, PageSource, ReaderProxy, RetryPolicy};
use crate::crawler::scheduler::BatchScheduler;
use crate::state::{
    CrawlEntry, CrawlSession, CrawlStats, CrawlStatus, LinkCandidate, SessionPhase,
};
use crate::storage::ResultStore;
use crate::url::{is_same_domain, is_valid_http_url, resolve};
use crate::{CrawlerError, Result};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Result of processing one URL in a wave
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlOutcome {
    pub url: String,

    /// Content is available for the URL after this step
    pub success: bool,

    /// The URL was already completed and was not fetched again
    pub skipped: bool,
}

/// Aggregate counts for one crawl or retry wave
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BatchReport {
    fn from_outcomes(outcomes: &[UrlOutcome]) -> Self {
        let mut report = Self {
            attempted: outcomes.len(),
            ..Self::default()
        };
        for outcome in outcomes {
            if outcome.skipped {
                report.skipped += 1;
            }
            if outcome.success {
                report.succeeded += 1;
            } else {
                report.failed += 1;
            }
        }
        report
    }

    /// True when the wave had nothing to do
    pub fn is_noop(&self) -> bool {
        self.attempted == 0
    }
}

/// Result of fetching the seed page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub seed_url: String,

    /// In-domain links added to the fresh frontier
    pub links_found: usize,
}

fn lock_session(session: &Mutex<CrawlSession>) -> MutexGuard<'_, CrawlSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Main crawler coordinator structure
///
/// The coordinator owns the session context. Its lock is only taken for
/// short, synchronous updates and is never held across a fetch, so progress
/// readers holding [`Coordinator::session_handle`] see live snapshots while a
/// wave runs.
pub struct Coordinator<S> {
    fetcher: ContentFetcher<S>,
    session: Arc<Mutex<CrawlSession>>,
    concurrency_limit: usize,
}

impl Coordinator<ReaderProxy> {
    /// Creates a coordinator that fetches through the configured reader proxy
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `session` - A restored session, or a fresh one
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(CrawlerError)` - Failed to build the HTTP client
    pub fn from_config(config: &Config, session: CrawlSession) -> Result<Self> {
        let proxy = ReaderProxy::new(&config.proxy)?;
        let fetcher = ContentFetcher::new(proxy, RetryPolicy::from_config(&config.crawler));
        Ok(Self::with_session(
            fetcher,
            config.crawler.concurrency_limit,
            session,
        ))
    }
}

impl<S: PageSource> Coordinator<S> {
    /// Creates a coordinator with an empty session
    pub fn new(fetcher: ContentFetcher<S>, concurrency_limit: usize) -> Self {
        Self::with_session(fetcher, concurrency_limit, CrawlSession::new())
    }

    /// Creates a coordinator around an existing session
    pub fn with_session(
        fetcher: ContentFetcher<S>,
        concurrency_limit: usize,
        session: CrawlSession,
    ) -> Self {
        Self {
            fetcher,
            session: Arc::new(Mutex::new(session)),
            concurrency_limit: concurrency_limit.max(1),
        }
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    pub fn set_concurrency_limit(&mut self, limit: usize) {
        self.concurrency_limit = limit.max(1);
    }

    /// Shared handle for progress readers
    pub fn session_handle(&self) -> Arc<Mutex<CrawlSession>> {
        Arc::clone(&self.session)
    }

    /// A copy of the current session, for saving
    pub fn snapshot(&self) -> CrawlSession {
        self.lock().clone()
    }

    pub fn snapshot_stats(&self) -> CrawlStats {
        self.lock().table.snapshot_stats()
    }

    pub fn progress(&self) -> u8 {
        self.lock().progress
    }

    pub fn phase(&self) -> SessionPhase {
        self.lock().phase
    }

    pub fn seed_url(&self) -> Option<String> {
        self.lock().seed_url.clone()
    }

    pub fn is_crawling(&self) -> bool {
        self.phase() == SessionPhase::Crawling
    }

    pub fn is_retrying(&self) -> bool {
        self.phase() == SessionPhase::Retrying
    }

    pub fn is_busy(&self) -> bool {
        self.phase().is_busy()
    }

    /// The frontier, in discovery order
    pub fn frontier(&self) -> Vec<LinkCandidate> {
        self.lock().frontier.iter().cloned().collect()
    }

    pub fn completed_entries(&self) -> Vec<CrawlEntry> {
        self.lock().table.completed_entries()
    }

    /// Clears the state table, frontier, seed, and progress
    pub fn reset_session(&self) {
        self.lock().reset();
        tracing::info!("Session reset");
    }

    pub fn selected_count(&self) -> usize {
        self.lock().frontier.selected_count()
    }

    pub fn toggle_selection(&self, index: usize) -> Option<bool> {
        self.lock().frontier.toggle(index)
    }

    pub fn select_all(&self, selected: bool) {
        self.lock().frontier.select_all(selected);
    }

    /// Selects frontier links whose URL contains `pattern`
    pub fn select_matching(&self, pattern: &str) -> usize {
        self.lock().frontier.select_matching(pattern)
    }

    /// Fetches the seed page and starts a fresh session from it
    ///
    /// All prior crawl state and the frontier are cleared first. On success
    /// the seed is recorded as completed and its in-domain links form the new
    /// frontier.
    ///
    /// # Returns
    ///
    /// * `Ok(SeedReport)` - Seed fetched, frontier built
    /// * `Err(CrawlerError::Validation)` - Empty or non-http(s) seed; nothing changed
    /// * `Err(CrawlerError::FetchFailed)` - Seed could not be fetched; session is empty
    pub async fn fetch_initial_content(&self, seed_url: &str) -> Result<SeedReport> {
        let seed_url = seed_url.trim();
        if seed_url.is_empty() {
            return Err(CrawlerError::Validation("seed URL is empty".to_string()));
        }
        if !is_valid_http_url(seed_url) {
            return Err(CrawlerError::Validation(format!(
                "seed URL must start with http:// or https://: {}",
                seed_url
            )));
        }

        {
            let mut session = self.lock();
            if session.phase.is_busy() {
                return Err(CrawlerError::Busy {
                    operation: "initial fetch",
                });
            }
            session.reset();
            session.seed_url = Some(seed_url.to_string());
            session.phase = SessionPhase::InitialFetch;
        }

        tracing::info!("Fetching seed {}", seed_url);

        match self.fetcher.fetch(seed_url).await {
            Ok(content) => {
                let mut session = self.lock();
                let links_found = fold_links(&mut session, &content, seed_url);
                session.table.mark_completed(seed_url, content);
                session.phase = SessionPhase::AwaitingSelection;

                if links_found == 0 {
                    tracing::warn!("No in-domain links found on {}", seed_url);
                } else {
                    tracing::info!("Extracted {} links from {}", links_found, seed_url);
                }

                Ok(SeedReport {
                    seed_url: seed_url.to_string(),
                    links_found,
                })
            }
            Err(e) => {
                let mut session = self.lock();
                session.table.clear();
                session.frontier.clear();
                session.phase = SessionPhase::Idle;
                Err(e)
            }
        }
    }

    /// Crawls the selected frontier links
    ///
    /// Completed entries are reused, failed ones are reset to pending, and
    /// the rest get a pending entry before the wave starts.
    pub async fn crawl_selected(&self) -> Result<BatchReport> {
        let urls = {
            let mut session = self.lock();
            if session.phase.is_busy() {
                return Err(CrawlerError::Busy { operation: "crawl" });
            }

            let urls = session.frontier.selected_urls();
            if urls.is_empty() {
                return Err(CrawlerError::NoSelection);
            }

            for url in &urls {
                if !session.table.reset_to_pending(url) {
                    session.table.upsert_pending(url);
                }
            }
            session.progress = 0;
            session.phase = SessionPhase::Crawling;
            urls
        };

        tracing::info!(
            "Crawling {} selected URLs with concurrency {}",
            urls.len(),
            self.concurrency_limit
        );

        let report = self.run_wave(&urls).await;
        tracing::info!(
            "Crawl finished: {} succeeded, {} failed ({} already completed)",
            report.succeeded,
            report.failed,
            report.skipped
        );
        Ok(report)
    }

    /// Retries every URL currently in the error state
    ///
    /// With no failed URLs this is a no-op that performs no fetches.
    pub async fn retry_failed(&self) -> Result<BatchReport> {
        let urls = {
            let mut session = self.lock();
            if session.phase.is_busy() {
                return Err(CrawlerError::Busy { operation: "retry" });
            }

            let urls = session.table.urls_with_status(CrawlStatus::Error);
            if urls.is_empty() {
                tracing::info!("No failed URLs to retry");
                return Ok(BatchReport::default());
            }

            for url in &urls {
                session.table.reset_to_pending(url);
            }
            session.progress = 0;
            session.phase = SessionPhase::Retrying;
            urls
        };

        tracing::info!("Retrying {} failed URLs", urls.len());

        let report = self.run_wave(&urls).await;
        tracing::info!(
            "Retry finished: {} recovered, {} still failing",
            report.succeeded,
            report.failed
        );
        Ok(report)
    }

    /// Processes a single URL
    ///
    /// Already-completed URLs are skipped without a fetch. Otherwise the URL
    /// is fetched; on success its links are folded into the frontier, on
    /// failure it is marked as an error. Failures never propagate.
    pub async fn process_url(&self, url: String) -> UrlOutcome {
        {
            let mut session = self.lock();
            if session.table.status(&url) == Some(CrawlStatus::Completed) {
                tracing::debug!("{} already completed, skipping", url);
                return UrlOutcome {
                    url,
                    success: true,
                    skipped: true,
                };
            }
            session.table.mark_fetching(&url);
        }

        match self.fetcher.fetch(&url).await {
            Ok(content) => {
                let mut session = self.lock();
                let added = fold_links(&mut session, &content, &url);
                session.table.mark_completed(&url, content);
                tracing::debug!("{} completed, {} new links", url, added);
                UrlOutcome {
                    url,
                    success: true,
                    skipped: false,
                }
            }
            Err(e) => {
                tracing::warn!("{}", e);
                self.lock().table.mark_error(&url);
                UrlOutcome {
                    url,
                    success: false,
                    skipped: false,
                }
            }
        }
    }

    /// Writes completed entries to the result store
    ///
    /// Refused while a crawl or retry is running so that a half-finished
    /// wave never reaches durable storage.
    pub fn persist_completed(&self, store: &mut dyn ResultStore) -> Result<usize> {
        let entries = {
            let session = self.lock();
            if session.phase.is_busy() {
                return Err(CrawlerError::Busy { operation: "persist" });
            }
            session.table.completed_entries()
        };

        if entries.is_empty() {
            return Ok(0);
        }

        let written = store.put_pages(&entries)?;
        tracing::info!("Saved {} completed pages", written);
        Ok(written)
    }

    async fn run_wave(&self, urls: &[String]) -> BatchReport {
        let scheduler = BatchScheduler::new(self.concurrency_limit);

        let outcomes = scheduler
            .run_batches(
                urls,
                move |url| self.process_url(url),
                |done, total| {
                    let percent = (done * 100 / total) as u8;
                    self.lock().progress = percent;
                    tracing::info!("Progress: {}/{} URLs ({}%)", done, total, percent);
                },
            )
            .await;

        let mut session = self.lock();
        session.progress = 100;
        session.phase = if session.seed_url.is_some() {
            SessionPhase::AwaitingSelection
        } else {
            SessionPhase::Idle
        };

        BatchReport::from_outcomes(&outcomes)
    }

    fn lock(&self) -> MutexGuard<'_, CrawlSession> {
        lock_session(&self.session)
    }
}

/// Resolves the links in `content` against `source_url` and adds those on the
/// seed's domain to the frontier
///
/// Returns the number of links newly added.
fn fold_links(session: &mut CrawlSession, content: &str, source_url: &str) -> usize {
    let Some(seed_url) = session.seed_url.clone() else {
        return 0;
    };

    let mut added = 0;
    for link in extract_links(content) {
        let absolute = match resolve(source_url, &link.url) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("Skipping link: {}", e);
                continue;
            }
        };

        if !is_same_domain(&absolute, &seed_url) {
            tracing::trace!("Skipping off-domain link {}", absolute);
            continue;
        }

        if session.frontier.push(LinkCandidate::new(absolute, &link.text)) {
            added += 1;
        }
    }
    added
}
