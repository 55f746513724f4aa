//! Crawl state table
//!
//! The in-memory map of URL → {content, status} that is the single source of
//! truth for crawl progress during a session. Entries keep insertion order so
//! that listings and exports follow the order URLs entered the crawl.

use crate::state::CrawlStatus;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One discovered or crawled URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlEntry {
    /// Absolute URL, unique within a session
    pub url: String,

    /// Fetched text, `None` until fetched (or after a failure)
    pub content: Option<String>,

    /// Current status
    pub status: CrawlStatus,
}

impl CrawlEntry {
    fn pending(url: &str) -> Self {
        Self {
            url: url.to_string(),
            content: None,
            status: CrawlStatus::Pending,
        }
    }
}

/// Counts of entries by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CrawlStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub fetching: usize,
    pub error: usize,
}

/// URL-keyed table of crawl entries
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<CrawlEntry>", into = "Vec<CrawlEntry>")]
pub struct CrawlTable {
    entries: Vec<CrawlEntry>,
    index: HashMap<String, usize>,
}

impl From<Vec<CrawlEntry>> for CrawlTable {
    fn from(entries: Vec<CrawlEntry>) -> Self {
        let mut table = Self::default();
        for entry in entries {
            // Later duplicates overwrite earlier ones
            match table.index.get(&entry.url) {
                Some(&i) => table.entries[i] = entry,
                None => {
                    table.index.insert(entry.url.clone(), table.entries.len());
                    table.entries.push(entry);
                }
            }
        }
        table
    }
}

impl From<CrawlTable> for Vec<CrawlEntry> {
    fn from(table: CrawlTable) -> Self {
        table.entries
    }
}

impl CrawlTable {
    /// Creates an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the entry for a URL
    pub fn get(&self, url: &str) -> Option<&CrawlEntry> {
        self.index.get(url).map(|&i| &self.entries[i])
    }

    /// Gets the status of a URL, if present
    pub fn status(&self, url: &str) -> Option<CrawlStatus> {
        self.get(url).map(|entry| entry.status)
    }

    /// Inserts a pending entry if the URL is absent
    ///
    /// Existing entries keep their status and content. Returns true if a new
    /// entry was created.
    pub fn upsert_pending(&mut self, url: &str) -> bool {
        if self.index.contains_key(url) {
            return false;
        }
        self.index.insert(url.to_string(), self.entries.len());
        self.entries.push(CrawlEntry::pending(url));
        true
    }

    /// Moves an `error` entry back to `pending`
    ///
    /// Entries in any other status are left alone. Returns true if the entry
    /// transitioned.
    pub fn reset_to_pending(&mut self, url: &str) -> bool {
        match self.entry_mut(url) {
            Some(entry) if entry.status == CrawlStatus::Error => {
                entry.status = CrawlStatus::Pending;
                true
            }
            _ => false,
        }
    }

    /// Marks a URL as being fetched, creating the entry if absent
    pub fn mark_fetching(&mut self, url: &str) {
        self.entry_or_insert(url).status = CrawlStatus::Fetching;
    }

    /// Records fetched content and marks the URL completed
    pub fn mark_completed(&mut self, url: &str, content: String) {
        let entry = self.entry_or_insert(url);
        entry.content = Some(content);
        entry.status = CrawlStatus::Completed;
    }

    /// Marks a URL as failed
    pub fn mark_error(&mut self, url: &str) {
        self.entry_or_insert(url).status = CrawlStatus::Error;
    }

    /// Resets entries left in `fetching` by an abandoned run back to `pending`
    ///
    /// Returns the number of recovered entries.
    pub fn recover_interrupted(&mut self) -> usize {
        let mut recovered = 0;
        for entry in &mut self.entries {
            if entry.status == CrawlStatus::Fetching {
                entry.status = CrawlStatus::Pending;
                recovered += 1;
            }
        }
        recovered
    }

    /// Returns URLs currently in the given status, in insertion order
    pub fn urls_with_status(&self, status: CrawlStatus) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| entry.status == status)
            .map(|entry| entry.url.clone())
            .collect()
    }

    /// Returns clones of all completed entries
    pub fn completed_entries(&self) -> Vec<CrawlEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.status.is_success())
            .cloned()
            .collect()
    }

    /// Counts entries by status, recomputed from the table
    pub fn snapshot_stats(&self) -> CrawlStats {
        let mut stats = CrawlStats {
            total: self.entries.len(),
            ..CrawlStats::default()
        };

        for entry in &self.entries {
            match entry.status {
                CrawlStatus::Pending => stats.pending += 1,
                CrawlStatus::Fetching => stats.fetching += 1,
                CrawlStatus::Completed => stats.completed += 1,
                CrawlStatus::Error => stats.error += 1,
            }
        }

        stats
    }

    /// All entries in insertion order
    pub fn entries(&self) -> &[CrawlEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every entry
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    fn entry_mut(&mut self, url: &str) -> Option<&mut CrawlEntry> {
        let i = *self.index.get(url)?;
        Some(&mut self.entries[i])
    }

    fn entry_or_insert(&mut self, url: &str) -> &mut CrawlEntry {
        self.upsert_pending(url);
        let i = self.index[url];
        &mut self.entries[i]
    }
}
