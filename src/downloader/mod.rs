//! Paced batch execution
//!
//! This module runs the planned batches against the query service and turns
//! every response into a classified [`BatchOutcome`].
//!
//! # Overview
//!
//! 1. **Pacing**: Every request start waits on [`rate_limit::RateLimiter`]
//! 2. **Execution**: [`executor::BatchExecutor`] sends each batch exactly once
//! 3. **Classification**: Status, body and shape checks produce the outcome
//! 4. **Recording**: The outcome's summary is written back to the request
//!
//! # Quick Start
//!
//! ```no_run
//! use insights_exporter::downloader::{BatchExecutor, ExecutorConfig};
//! use insights_exporter::fetcher::InsightsHttpClient;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example(mut requests: Vec<insights_exporter::request::BatchRequest>) -> Result<(), Box<dyn std::error::Error>> {
//! let config = ExecutorConfig::default().with_pacing_delay(Duration::from_secs(1));
//! let transport = Arc::new(InsightsHttpClient::new(config.request_timeout)?);
//! let outcomes = BatchExecutor::new(transport, config)
//!     .execute_all(&mut requests)
//!     .await;
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Nothing in this module returns an error for a single batch. Transport
//! failures, unexpected statuses and malformed bodies become outcomes and the
//! next batch runs regardless.

pub mod config;
pub mod executor;
pub mod outcome;
pub mod rate_limit;

pub use config::ExecutorConfig;
pub use executor::{classify_response, BatchExecutor};
pub use outcome::{BatchOutcome, OutcomeKind};
pub use rate_limit::{RateLimitError, RateLimiter};
