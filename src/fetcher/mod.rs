//! Query transport and response parsing
//!
//! The executor talks to the remote service only through [`QueryTransport`],
//! which sends one [`BatchRequest`] and hands back the raw status and body.
//! Deciding what the response *means* is left to the executor and
//! [`insights_parser`].

use crate::request::BatchRequest;
use async_trait::async_trait;

pub mod insights_http;
pub mod insights_parser;

pub use insights_http::InsightsHttpClient;
pub use insights_parser::{parse_events, ParseError};

/// Transport errors (connection-level, never HTTP status)
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// Connection refused, DNS failure, TLS error, broken body stream
    #[error("network error: {0}")]
    NetworkError(String),

    /// No response within the per-request timeout
    #[error("request timed out after {0} ms")]
    Timeout(u128),

    /// The request descriptor could not be turned into an HTTP request
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// HTTP client could not be constructed
    #[error("client error: {0}")]
    ClientError(String),
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// Status and body of a completed HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as text
    pub body: String,
}

impl RawResponse {
    /// Create a response
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Sends a single batch to the query service
#[async_trait]
pub trait QueryTransport: Send + Sync {
    /// Execute the request described by `request.transport`
    ///
    /// # Errors
    /// Returns [`FetcherError`] only for transport-level failures; any HTTP
    /// status, expected or not, is returned as a [`RawResponse`].
    async fn send(&self, request: &BatchRequest) -> FetcherResult<RawResponse>;
}
