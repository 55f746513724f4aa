//! Crawl session context
//!
//! A session lives from a seed fetch until an explicit reset. It owns the
//! crawl state table, the link frontier, and the progress of the current wave.

use crate::state::{CrawlTable, Frontier};
use serde::Serialize;
use std::fmt;

/// Where the orchestrator is in a session's lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No crawl activity; also the state after a failed seed fetch
    #[default]
    Idle,

    /// The seed URL is being fetched
    InitialFetch,

    /// The seed is fetched and the operator can select links
    AwaitingSelection,

    /// A wave over selected links is running
    Crawling,

    /// A wave over previously failed links is running
    Retrying,
}

impl SessionPhase {
    /// Returns true while a crawl or retry wave is in flight
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Crawling | Self::Retrying)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::InitialFetch => "initial_fetch",
            Self::AwaitingSelection => "awaiting_selection",
            Self::Crawling => "crawling",
            Self::Retrying => "retrying",
        };
        write!(f, "{}", name)
    }
}

/// All state of one crawl session
#[derive(Debug, Clone, Default)]
pub struct CrawlSession {
    /// The seed URL; also the domain reference for discovered links
    pub seed_url: Option<String>,

    /// URL → {content, status}
    pub table: CrawlTable,

    /// Discovered in-domain links available for selection
    pub frontier: Frontier,

    /// Progress of the current or last wave, 0-100
    pub progress: u8,

    /// Lifecycle phase
    pub phase: SessionPhase,
}

impl CrawlSession {
    /// Creates an empty, idle session
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a session from saved parts
    ///
    /// Entries left in `fetching` by an abandoned run go back to `pending`,
    /// and the phase is derived from what was saved.
    pub fn restore(
        seed_url: Option<String>,
        mut table: CrawlTable,
        frontier: Frontier,
        progress: u8,
    ) -> Self {
        let recovered = table.recover_interrupted();
        if recovered > 0 {
            tracing::info!("Recovered {} interrupted entries to pending", recovered);
        }

        let phase = if seed_url.is_some() && !table.is_empty() {
            SessionPhase::AwaitingSelection
        } else {
            SessionPhase::Idle
        };

        Self {
            seed_url,
            table,
            frontier,
            progress: progress.min(100),
            phase,
        }
    }

    /// Clears all crawl state and the frontier
    pub fn reset(&mut self) {
        self.seed_url = None;
        self.table.clear();
        self.frontier.clear();
        self.progress = 0;
        self.phase = SessionPhase::Idle;
    }
}
