//! Batch scheduler for crawl waves
//!
//! This module handles:
//! - Partitioning a wave's URLs into fixed-size concurrency windows
//! - Running each window's work concurrently and waiting for all of it
//! - Reporting attempted/total progress after every window
//!
//! Windows run strictly one after another, so at most `concurrency_limit`
//! operations are ever in flight. That is the only backpressure the crawler
//! applies to the rendering proxy.

use futures::future::join_all;
use std::future::Future;

/// Runs URL processing in sequential, concurrency-bounded windows
#[derive(Debug, Clone, Copy)]
pub struct BatchScheduler {
    concurrency_limit: usize,
}

impl BatchScheduler {
    /// Creates a scheduler; a limit of zero is treated as one
    pub fn new(concurrency_limit: usize) -> Self {
        Self {
            concurrency_limit: concurrency_limit.max(1),
        }
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    /// Runs `process` over `urls` one window at a time
    ///
    /// Every operation in a window is started together and awaited together;
    /// `process` must capture its own failures in `T` so that one URL never
    /// cancels its siblings. After each window settles, `on_progress` is
    /// called with the number of URLs attempted so far and the total.
    ///
    /// # Arguments
    ///
    /// * `urls` - The URLs of this wave, in order
    /// * `process` - Per-URL operation
    /// * `on_progress` - Called once per window with `(attempted, total)`
    ///
    /// # Returns
    ///
    /// Per-URL results in input order. An empty `urls` returns immediately
    /// without calling `on_progress`.
    pub async fn run_batches<T, F, Fut, P>(
        &self,
        urls: &[String],
        mut process: F,
        mut on_progress: P,
    ) -> Vec<T>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = T>,
        P: FnMut(usize, usize),
    {
        let total = urls.len();
        let mut results = Vec::with_capacity(total);
        if total == 0 {
            return results;
        }

        let mut attempted = 0;
        for (window_index, window) in urls.chunks(self.concurrency_limit).enumerate() {
            tracing::debug!(
                "Starting window {} with {} URLs",
                window_index + 1,
                window.len()
            );

            let tasks: Vec<_> = window.iter().map(|url| process(url.clone())).collect();
            results.extend(join_all(tasks).await);

            attempted += window.len();
            on_progress(attempted, total);
        }

        results
    }
}
