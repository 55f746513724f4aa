//! URL handling module for Reader-Crawler
//!
//! This module provides link resolution against a base URL, the same-domain
//! policy that keeps a crawl on the seed's host, and seed validation.

mod domain;
mod resolve;

// Re-export main functions
pub use domain::{extract_domain, is_same_domain};
pub use resolve::{is_valid_http_url, resolve, strip_fragment};
