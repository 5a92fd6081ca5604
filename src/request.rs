//! NRQL request construction
//!
//! Turns a planned [`TimeWindow`] plus the user's query template into a fully
//! specified [`BatchRequest`]. Building is pure: nothing here touches the
//! network.

use crate::TimeWindow;
use chrono::DateTime;
use reqwest::Method;
use serde::Serialize;
use url::Url;

/// Default Insights query API host (US region)
pub const DEFAULT_BASE_URL: &str = "https://insights-api.newrelic.com";

/// Status codes accepted as success when none are configured
pub const DEFAULT_EXPECTED_STATUSES: &[u16] = &[200];

/// Header carrying the query key
pub const QUERY_KEY_HEADER: &str = "X-Query-Key";

/// NRQL timestamp literal layout. Bounds are always rendered in UTC.
const NRQL_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

/// Account and key used for every batch
#[derive(Clone)]
pub struct QueryCredentials {
    account_id: String,
    api_key: String,
}

impl QueryCredentials {
    /// Create credentials for an account
    pub fn new(account_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            api_key: api_key.into(),
        }
    }

    /// Account the queries run against
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Insights query key
    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl std::fmt::Debug for QueryCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCredentials")
            .field("account_id", &self.account_id)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// How to send one batch
#[derive(Debug, Clone)]
pub struct TransportDescriptor {
    /// Endpoint without query string
    pub endpoint: String,
    /// HTTP method
    pub method: Method,
    /// Query string parameters (unencoded)
    pub query_params: Vec<(String, String)>,
    /// Request headers
    pub headers: Vec<(String, String)>,
    /// Status codes treated as success
    pub expected_statuses: Vec<u16>,
}

impl TransportDescriptor {
    /// Whether `status` is one of the expected success codes
    pub fn is_expected_status(&self, status: u16) -> bool {
        self.expected_statuses.contains(&status)
    }
}

/// Result recorded on a request once it has been executed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchResult {
    /// Number of records returned (zero for an empty result)
    Records(usize),
    /// Failure reason
    Failed(String),
}

impl std::fmt::Display for BatchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchResult::Records(count) => write!(f, "{count}"),
            BatchResult::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// One query per window
#[derive(Debug, Clone)]
pub struct BatchRequest {
    /// Ordinal index in planning order
    pub id: usize,
    /// Human readable label ("Batch 3")
    pub label: String,
    /// Window this batch covers
    pub window: TimeWindow,
    /// Full NRQL statement including the time clause
    pub query_text: String,
    /// Transport parameters
    pub transport: TransportDescriptor,
    /// Set once by the executor
    pub result: Option<BatchResult>,
}

impl BatchRequest {
    /// Render the full request URL with the encoded query string
    pub fn url(&self) -> Result<Url, url::ParseError> {
        Url::parse_with_params(
            &self.transport.endpoint,
            self.transport
                .query_params
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str())),
        )
    }

    /// Record the execution result. Later calls are ignored.
    pub fn record_result(&mut self, result: BatchResult) {
        if self.result.is_none() {
            self.result = Some(result);
        }
    }
}

/// Format a Unix timestamp as an NRQL timestamp literal body
///
/// Out-of-range timestamps fall back to epoch seconds, which NRQL also accepts.
pub fn format_nrql_timestamp(timestamp: i64) -> String {
    match DateTime::from_timestamp(timestamp, 0) {
        Some(dt) => dt.format(NRQL_TIMESTAMP_FORMAT).to_string(),
        None => timestamp.to_string(),
    }
}

/// Append the window's time clause to a query template
pub fn bounded_query(template: &str, window: &TimeWindow) -> String {
    format!(
        "{} SINCE '{}' UNTIL '{}'",
        template.trim(),
        format_nrql_timestamp(window.since),
        format_nrql_timestamp(window.until)
    )
}

/// Query endpoint for an account
pub fn query_endpoint(base_url: &str, account_id: &str) -> String {
    format!(
        "{}/v1/accounts/{}/query",
        base_url.trim_end_matches('/'),
        account_id
    )
}

/// Build the request for one window
///
/// # Arguments
/// * `id` - Ordinal index of the window
/// * `window` - Window to query
/// * `template` - NRQL query without any SINCE/UNTIL clause
/// * `credentials` - Account and query key
/// * `base_url` - API host, e.g. [`DEFAULT_BASE_URL`]
/// * `expected_statuses` - Success status codes; empty means [`DEFAULT_EXPECTED_STATUSES`]
pub fn build_request(
    id: usize,
    window: TimeWindow,
    template: &str,
    credentials: &QueryCredentials,
    base_url: &str,
    expected_statuses: &[u16],
) -> BatchRequest {
    let query_text = bounded_query(template, &window);
    let expected_statuses = if expected_statuses.is_empty() {
        DEFAULT_EXPECTED_STATUSES.to_vec()
    } else {
        expected_statuses.to_vec()
    };

    BatchRequest {
        id,
        label: format!("Batch {id}"),
        window,
        transport: TransportDescriptor {
            endpoint: query_endpoint(base_url, credentials.account_id()),
            method: Method::GET,
            query_params: vec![("nrql".to_string(), query_text.clone())],
            headers: vec![
                ("Accept".to_string(), "application/json".to_string()),
                (
                    QUERY_KEY_HEADER.to_string(),
                    credentials.api_key().to_string(),
                ),
            ],
            expected_statuses,
        },
        query_text,
        result: None,
    }
}

/// Build one request per window, ids following window order
pub fn build_requests(
    windows: &[TimeWindow],
    template: &str,
    credentials: &QueryCredentials,
    base_url: &str,
    expected_statuses: &[u16],
) -> Vec<BatchRequest> {
    windows
        .iter()
        .enumerate()
        .map(|(id, window)| {
            build_request(
                id,
                *window,
                template,
                credentials,
                base_url,
                expected_statuses,
            )
        })
        .collect()
}
