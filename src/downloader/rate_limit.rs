//! Request pacing
//!
//! The Insights query API rate-limits per account, so request starts are
//! spaced by a fixed interval. The gate holds a single permit for the whole
//! pacing delay: callers queue on it in FIFO order and each one is released
//! one interval after the previous, however many requests are in flight.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::trace;

/// Pacing gate shared by all requests of a run
#[derive(Clone, Debug)]
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
    interval: Duration,
}

impl RateLimiter {
    /// Create a gate that lets one request start per `interval`
    ///
    /// # Arguments
    /// * `interval` - Delay inserted before every request start
    pub fn paced(interval: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(1)),
            interval,
        }
    }

    /// Wait for this caller's turn, then for the pacing interval
    ///
    /// Dropping the returned future early (e.g. on shutdown) gives the turn
    /// to the next waiter.
    pub async fn acquire(&self) -> Result<(), RateLimitError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| RateLimitError::AcquireError(e.to_string()))?;

        trace!(interval_ms = self.interval.as_millis(), "Pacing before request");
        sleep(self.interval).await;
        drop(permit);

        Ok(())
    }

    /// Close the gate on shutdown; pending and future [`acquire`](Self::acquire) calls fail
    pub fn close(&self) {
        self.semaphore.close();
    }
}

/// Rate limiter errors
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    /// Gate was closed
    #[error("failed to acquire rate limit permit: {0}")]
    AcquireError(String),
}
