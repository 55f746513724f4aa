//! Session statistics display
//!
//! This module formats the crawl state table's counts for the terminal.

use crate::state::CrawlStats;

/// Formats session statistics
///
/// # Arguments
///
/// * `stats` - Counts from the crawl state table
/// * `progress` - Progress of the current or last wave, 0-100
pub fn format_statistics(stats: &CrawlStats, progress: u8) -> String {
    let mut out = String::new();

    out.push_str("=== Crawl Statistics ===\n\n");
    out.push_str(&format!("  Total URLs:  {}\n", stats.total));
    out.push_str(&format!("  Completed:   {}\n", stats.completed));
    out.push_str(&format!("  Pending:     {}\n", stats.pending));
    out.push_str(&format!("  Fetching:    {}\n", stats.fetching));
    out.push_str(&format!("  Error:       {}\n", stats.error));
    out.push_str(&format!("  Progress:    {}%\n\n", progress));

    let success_rate = if stats.total > 0 {
        (stats.completed as f64 / stats.total as f64) * 100.0
    } else {
        0.0
    };

    out.push_str(&format!(
        "Success Rate: {:.1}% ({} / {} URLs completed)\n",
        success_rate, stats.completed, stats.total
    ));
    out
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStats, progress: u8) {
    print!("{}", format_statistics(stats, progress));
}
