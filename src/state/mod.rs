//! State module for tracking crawl progress
//!
//! This module provides the in-memory state of a crawl session.
//!
//! # Components
//!
//! - `CrawlStatus`: The per-URL state machine (pending, fetching, completed, error)
//! - `CrawlTable`: URL-keyed table of crawl entries, the source of truth for progress
//! - `Frontier`: Ordered, deduplicated links the operator can select
//! - `CrawlSession`: The session context owning all of the above

mod crawl_status;
mod crawl_table;
mod frontier;
mod session;

// Re-export main types
pub use crawl_status::CrawlStatus;
pub use crawl_table::{CrawlEntry, CrawlStats, CrawlTable};
pub use frontier::{Frontier, LinkCandidate};
pub use session::{CrawlSession, SessionPhase};
