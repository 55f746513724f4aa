//! Storage traits and error types
//!
//! This module defines the trait interfaces for storage backends and
//! associated error types. Three namespaces are kept apart:
//! - Results: completed pages keyed by URL
//! - Settings: operator preferences such as the concurrency limit
//! - Session: in-progress crawl state, cleared wholesale on reset

use crate::state::{CrawlEntry, CrawlSession};
use crate::storage::StoredPage;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable store of completed crawl results
pub trait ResultStore {
    /// Stores completed entries, replacing any earlier result for the same URL
    ///
    /// Entries in any status other than `completed` are ignored.
    ///
    /// # Returns
    ///
    /// The number of pages written
    fn put_pages(&mut self, entries: &[CrawlEntry]) -> StorageResult<usize>;

    /// Gets every stored page, oldest first
    fn get_all_pages(&self) -> StorageResult<Vec<StoredPage>>;

    /// Gets the stored page for a URL
    fn get_page(&self, url: &str) -> StorageResult<Option<StoredPage>>;

    /// Deletes the stored page for a URL, returning whether one existed
    fn delete_page(&mut self, url: &str) -> StorageResult<bool>;

    /// Deletes every stored page, returning how many were removed
    fn delete_all_pages(&mut self) -> StorageResult<usize>;
}

/// Key-value store for operator settings
pub trait SettingsStore {
    /// Gets a setting, or `default` when it was never written
    fn get_setting<T: DeserializeOwned>(&self, key: &str, default: T) -> StorageResult<T>;

    /// Writes a setting
    fn put_setting<T: Serialize>(&mut self, key: &str, value: &T) -> StorageResult<()>;
}

/// Store for the session that has not been persisted as results yet
pub trait SessionStore {
    /// Loads the saved session, if any
    fn load_session(&self) -> StorageResult<Option<CrawlSession>>;

    /// Saves the session, replacing whatever was saved before
    fn save_session(&mut self, session: &CrawlSession) -> StorageResult<()>;

    /// Removes all saved session state
    fn clear_session(&mut self) -> StorageResult<()>;
}
