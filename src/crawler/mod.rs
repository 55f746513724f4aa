//! Crawler module for page fetching and crawl orchestration
//!
//! This module contains the core crawling logic, including:
//! - Fetching through the reader proxy with retry logic
//! - Markdown and HTML link extraction
//! - Concurrency-bounded batch scheduling
//! - Session coordination (seed, crawl, retry)

mod coordinator;
mod extractor;
mod fetcher;
mod scheduler;

pub use coordinator::{BatchReport, Coordinator, SeedReport, UrlOutcome};
pub use extractor::{extract_links, ExtractedLink};
pub use fetcher::{
    build_http_client, ContentFetcher, FetchFailure, PageSource, ReaderProxy, RetryPolicy,
};
pub use scheduler::BatchScheduler;
