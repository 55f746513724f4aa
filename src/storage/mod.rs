//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Completed page results keyed by URL
//! - Operator settings
//! - Session state that survives between CLI invocations

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{ResultStore, SessionStore, SettingsStore, StorageError, StorageResult};

use crate::CrawlerError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

/// Settings key for the operator-configured concurrency limit
pub const MAX_CONCURRENT_REQUESTS_KEY: &str = "max_concurrent_requests";

/// Session keys
pub const SESSION_SEED_URL_KEY: &str = "crawler_initial_url";
pub const SESSION_FRONTIER_KEY: &str = "crawler_extracted_urls";
pub const SESSION_TABLE_KEY: &str = "crawler_crawled_data";
pub const SESSION_PROGRESS_KEY: &str = "crawler_progress";

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(CrawlerError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, CrawlerError> {
    SqliteStorage::new(path)
}

/// A completed page as stored in the results table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredPage {
    pub url: String,
    pub content: String,
    pub stored_at: DateTime<Utc>,
}
