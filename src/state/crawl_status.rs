/// Crawl status definitions for tracking per-URL progress
///
/// This module defines the states an entry moves through while a crawl session runs.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the current state of a URL in the crawl process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlStatus {
    /// URL has been selected or discovered but not yet fetched
    Pending,

    /// URL is currently being fetched
    Fetching,

    /// URL was fetched successfully and its content recorded
    Completed,

    /// URL could not be fetched after all retries
    Error,
}

impl CrawlStatus {
    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Converts the status to its stored string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for CrawlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
