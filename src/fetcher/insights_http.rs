//! Insights HTTP client
//!
//! Thin reqwest wrapper implementing [`QueryTransport`]. It does not retry and
//! does not interpret status codes; the executor owns both decisions.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::fetcher::{FetcherError, FetcherResult, QueryTransport, RawResponse};
use crate::request::BatchRequest;

/// HTTP transport for the Insights query API
#[derive(Clone)]
pub struct InsightsHttpClient {
    client: Arc<Client>,
    timeout: Duration,
}

impl InsightsHttpClient {
    /// Create a client with a per-request timeout
    ///
    /// # Errors
    /// Returns [`FetcherError::ClientError`] if the TLS backend cannot be initialised
    pub fn new(timeout: Duration) -> FetcherResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("insights-exporter/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetcherError::ClientError(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
            timeout,
        })
    }

    fn header_map(request: &BatchRequest) -> FetcherResult<HeaderMap> {
        let mut headers = HeaderMap::with_capacity(request.transport.headers.len());
        for (name, value) in &request.transport.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| FetcherError::InvalidRequest(format!("header name '{name}': {e}")))?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                FetcherError::InvalidRequest(format!("header value for '{}': {e}", name.as_str()))
            })?;
            headers.insert(name, value);
        }
        Ok(headers)
    }
}

#[async_trait]
impl QueryTransport for InsightsHttpClient {
    async fn send(&self, request: &BatchRequest) -> FetcherResult<RawResponse> {
        let headers = Self::header_map(request)?;

        debug!(
            batch = %request.label,
            endpoint = %request.transport.endpoint,
            "Sending query request"
        );

        let response = self
            .client
            .request(request.transport.method.clone(), &request.transport.endpoint)
            .query(&request.transport.query_params)
            .headers(headers)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetcherError::Timeout(self.timeout.as_millis())
                } else {
                    FetcherError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| FetcherError::NetworkError(format!("failed to read body: {e}")))?;

        debug!(batch = %request.label, status, bytes = body.len(), "Received response");

        Ok(RawResponse { status, body })
    }
}
