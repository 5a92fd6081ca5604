//! # Insights Exporter Library
//!
//! Exports event data from the New Relic Insights query API over time ranges
//! that are too wide (or too dense) for a single NRQL query. The range is
//! split into fixed-size windows, each window becomes one paced request, and
//! the returned events are merged back in window order and written to CSV.
//!
//! ## Features
//!
//! - **Window Planning**: Non-overlapping, ordered windows with a one-second
//!   gap at each internal boundary so boundary events are never duplicated
//! - **Paced Execution**: One request start per pacing interval, optional
//!   bounded concurrency with order-stable merging
//! - **Uniform Outcome Policy**: Every batch is classified once; failures never
//!   abort the run and a partial result is always exported
//! - **Truncation Signal**: Batches that hit the API page cap are flagged
//!
//! ## Quick Start
//!
//! ```no_run
//! use insights_exporter::downloader::{BatchExecutor, ExecutorConfig};
//! use insights_exporter::fetcher::InsightsHttpClient;
//! use insights_exporter::request::{build_requests, QueryCredentials, DEFAULT_BASE_URL};
//! use insights_exporter::window::plan_windows;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let windows = plan_windows(1_700_000_000, 1_700_172_800, 86_400)?;
//! let credentials = QueryCredentials::new("1234567", "NRIQ-...");
//! let mut requests = build_requests(
//!     &windows,
//!     "SELECT timestamp, duration FROM Transaction LIMIT MAX",
//!     &credentials,
//!     DEFAULT_BASE_URL,
//!     &[200],
//! );
//!
//! let config = ExecutorConfig::default();
//! let transport = Arc::new(InsightsHttpClient::new(config.request_timeout)?);
//! let executor = BatchExecutor::new(transport, config);
//! let outcomes = executor.execute_all(&mut requests).await;
//!
//! let report = insights_exporter::report::aggregate(&requests, outcomes);
//! println!("{} records, {} failures", report.combined_records.len(), report.total_failures);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`window`] - Window planning over `[start, end]`
//! - [`request`] - NRQL query text and transport descriptor per window
//! - [`fetcher`] - Transport trait, HTTP client and response parsing
//! - [`downloader`] - Paced batch execution and outcome classification
//! - [`report`] - Order-stable aggregation and run summary
//! - [`output`] - CSV export of the combined records

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// CLI command implementations
pub mod cli;

/// Paced batch execution
pub mod downloader;

/// Query transport and response parsing
pub mod fetcher;

/// Observability metrics
pub mod metrics;

/// Data output writers
pub mod output;

/// Aggregation and reporting of batch outcomes
pub mod report;

/// Request construction for individual windows
pub mod request;

/// Graceful shutdown coordination shared across modules
pub mod shutdown;

/// Time window planning
pub mod window;

pub use window::{plan_windows, InvalidRangeError};

/// One exported event: an arbitrary key/value mapping as returned by the API.
pub type EventRecord = serde_json::Map<String, serde_json::Value>;

/// A closed time range in Unix seconds (UTC).
///
/// Windows are produced by [`plan_windows`] and never modified afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Window start (Unix timestamp in seconds)
    pub since: i64,
    /// Window end (Unix timestamp in seconds)
    pub until: i64,
}

impl TimeWindow {
    /// Start of the window as a UTC datetime
    pub fn since_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp(self.since, 0)
    }

    /// End of the window as a UTC datetime
    pub fn until_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp(self.until, 0)
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.since_utc(), self.until_utc()) {
            (Some(since), Some(until)) => write!(
                f,
                "{} until {}",
                since.format("%Y-%m-%d %H:%M:%S"),
                until.format("%Y-%m-%d %H:%M:%S")
            ),
            _ => write!(f, "{} until {}", self.since, self.until),
        }
    }
}
