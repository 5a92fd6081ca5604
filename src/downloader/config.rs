//! Executor configuration constants

use std::time::Duration;

/// Delay before each request start.
/// 500 ms keeps a long export well under the Insights query rate limit.
pub const DEFAULT_PACING_DELAY_MS: u64 = 500;

/// Per-request response timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Page cap of the Insights query API (`LIMIT MAX`).
/// A window returning this many events may have been cut short.
pub const MAX_RESULTS_PER_QUERY: usize = 2_000;

/// Default number of requests in flight.
pub const DEFAULT_CONCURRENCY: usize = 1;

/// Upper bound on requests in flight.
pub const MAX_CONCURRENCY: usize = 8;

/// Default window size (one day).
pub const DEFAULT_WINDOW_SECONDS: i64 = 60 * 60 * 24;

/// Runtime settings for [`super::BatchExecutor`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Minimum spacing between request starts
    pub pacing_delay: Duration,
    /// Cap on each request's response time
    pub request_timeout: Duration,
    /// Record count at which a batch is flagged as truncated
    pub max_results_per_query: usize,
    /// Requests in flight (1 = strictly sequential)
    pub concurrency: usize,
}

impl ExecutorConfig {
    /// Set the pacing delay
    pub fn with_pacing_delay(mut self, pacing_delay: Duration) -> Self {
        self.pacing_delay = pacing_delay;
        self
    }

    /// Set the per-request timeout
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Set the truncation threshold
    pub fn with_max_results_per_query(mut self, max_results_per_query: usize) -> Self {
        self.max_results_per_query = max_results_per_query;
        self
    }

    /// Set concurrency, clamped to `1..=MAX_CONCURRENCY`
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, MAX_CONCURRENCY);
        self
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            pacing_delay: Duration::from_millis(DEFAULT_PACING_DELAY_MS),
            request_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_results_per_query: MAX_RESULTS_PER_QUERY,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}
