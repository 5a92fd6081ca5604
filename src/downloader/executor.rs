//! Batch executor (paced, one attempt per batch)
//!
//! Runs every [`BatchRequest`] against a [`QueryTransport`] and classifies the
//! response into a [`BatchOutcome`]. Failures are logged and recorded but never
//! stop the remaining batches: the run always reaches the export step with
//! whatever was gathered.

use crate::downloader::config::ExecutorConfig;
use crate::downloader::outcome::BatchOutcome;
use crate::downloader::rate_limit::RateLimiter;
use crate::fetcher::{parse_events, FetcherError, QueryTransport, RawResponse};
use crate::metrics::BatchMetrics;
use crate::request::BatchRequest;
use crate::shutdown::{self, SharedShutdown};
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Classify a completed HTTP exchange
///
/// # Arguments
/// * `request` - The batch the response belongs to (expected statuses, label)
/// * `response` - Status and body as received
/// * `max_results_per_query` - Record count at which the batch is flagged truncated
pub fn classify_response(
    request: &BatchRequest,
    response: RawResponse,
    max_results_per_query: usize,
) -> BatchOutcome {
    if !request.transport.is_expected_status(response.status) {
        return BatchOutcome::UnexpectedStatus {
            status: response.status,
            body: response.body,
        };
    }

    match parse_events(&response.body) {
        Ok(records) => BatchOutcome::from_records(records, max_results_per_query),
        Err(e) => BatchOutcome::MalformedResponse {
            reason: e.to_string(),
            body: response.body,
        },
    }
}

/// Executes batch requests under the pacing policy
pub struct BatchExecutor {
    transport: Arc<dyn QueryTransport>,
    config: ExecutorConfig,
    rate_limiter: RateLimiter,
    shutdown: Option<SharedShutdown>,
    progress: Option<ProgressBar>,
}

impl BatchExecutor {
    /// Create an executor over `transport`
    pub fn new(transport: Arc<dyn QueryTransport>, config: ExecutorConfig) -> Self {
        let rate_limiter = RateLimiter::paced(config.pacing_delay);
        Self {
            transport,
            config,
            rate_limiter,
            shutdown: shutdown::get_global_shutdown(),
            progress: None,
        }
    }

    /// Attach a shared shutdown handle for graceful cancellation.
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Advance `progress` by one for every finished batch
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Execute all requests
    ///
    /// Requests start in index order, each after the pacing delay, with at
    /// most `config.concurrency` in flight. The returned outcomes are
    /// positional: `outcomes[i]` belongs to `requests[i]`, whatever order the
    /// responses arrived in. Each request's `result` is set on return.
    pub async fn execute_all(&self, requests: &mut [BatchRequest]) -> Vec<BatchOutcome> {
        info!(
            batches = requests.len(),
            concurrency = self.config.concurrency,
            pacing_ms = self.config.pacing_delay.as_millis(),
            timeout_ms = self.config.request_timeout.as_millis(),
            "Beginning {} batch requests",
            requests.len()
        );

        let outcomes: Vec<BatchOutcome> = stream::iter(requests.iter())
            .map(|request| self.execute_one(request))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        for (request, outcome) in requests.iter_mut().zip(&outcomes) {
            request.record_result(outcome.batch_result());
        }

        info!(batches = outcomes.len(), "Batch requests complete");
        outcomes
    }

    async fn execute_one(&self, request: &BatchRequest) -> BatchOutcome {
        let outcome = self.attempt(request).await;

        self.log_outcome(request, &outcome);
        if let Some(progress) = &self.progress {
            progress.inc(1);
        }

        outcome
    }

    async fn attempt(&self, request: &BatchRequest) -> BatchOutcome {
        if self.shutdown_requested() {
            return BatchOutcome::Cancelled;
        }

        let paced = match &self.shutdown {
            Some(shutdown) => {
                tokio::select! {
                    result = self.rate_limiter.acquire() => result,
                    _ = shutdown.wait_for_shutdown() => {
                        // Release every other batch still queued on the gate
                        self.rate_limiter.close();
                        return BatchOutcome::Cancelled;
                    }
                }
            }
            None => self.rate_limiter.acquire().await,
        };
        // The gate is only closed on shutdown
        if paced.is_err() {
            return BatchOutcome::Cancelled;
        }

        info!(
            batch = %request.label,
            since = request.window.since,
            until = request.window.until,
            "Requesting {}: {}",
            request.label,
            request.window
        );

        let metrics = BatchMetrics::start(request.label.as_str());
        let response =
            tokio::time::timeout(self.config.request_timeout, self.transport.send(request)).await;

        let outcome = match response {
            Err(_elapsed) => BatchOutcome::TransportError {
                message: FetcherError::Timeout(self.config.request_timeout.as_millis())
                    .to_string(),
            },
            Ok(Err(e)) => BatchOutcome::TransportError {
                message: e.to_string(),
            },
            Ok(Ok(raw)) => classify_response(request, raw, self.config.max_results_per_query),
        };

        metrics.record(&outcome);
        outcome
    }

    fn log_outcome(&self, request: &BatchRequest, outcome: &BatchOutcome) {
        let batch = request.label.as_str();
        match outcome {
            BatchOutcome::Success { records, truncated } => {
                if *truncated {
                    warn!(
                        batch,
                        count = records.len(),
                        url = %request.url().map(|u| u.to_string()).unwrap_or_default(),
                        "{} - Maximum number of events returned ({}), window may be incomplete",
                        batch,
                        records.len()
                    );
                } else {
                    info!(batch, count = records.len(), "{} returned {} events", batch, records.len());
                }
            }
            BatchOutcome::EmptyResult => {
                warn!(
                    batch,
                    query = %request.query_text,
                    "{} - No events for this query, this might be OK",
                    batch
                );
            }
            BatchOutcome::MalformedResponse { reason, body } => {
                error!(
                    batch,
                    since = request.window.since,
                    until = request.window.until,
                    reason = %reason,
                    body = %body,
                    "{} - Malformed response: {}",
                    batch,
                    reason
                );
            }
            BatchOutcome::TransportError { message } => {
                error!(batch, error = %message, "{} failed with error: {}", batch, message);
            }
            BatchOutcome::UnexpectedStatus { status, body } => {
                error!(
                    batch,
                    status,
                    expected = ?request.transport.expected_statuses,
                    body = %body,
                    "{} - Expected {:?} response code but got '{}'",
                    batch,
                    request.transport.expected_statuses,
                    status
                );
            }
            BatchOutcome::Cancelled => {
                warn!(batch, "{} skipped: shutdown requested", batch);
            }
        }
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .map(|s| s.is_shutdown_requested())
            .unwrap_or(false)
    }
}
