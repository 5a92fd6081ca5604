//! Classified batch outcomes

use crate::request::BatchResult;
use crate::EventRecord;
use serde::Serialize;

/// Result of attempting one batch. Produced once, never revised.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    /// Events returned
    Success {
        /// Events in API order
        records: Vec<EventRecord>,
        /// Record count reached the page cap; the window may be incomplete
        truncated: bool,
    },
    /// Valid response without events. Not a failure.
    EmptyResult,
    /// Body is not JSON or lacks `results[0].events`
    MalformedResponse {
        /// What was wrong with the body
        reason: String,
        /// Response body, kept for diagnosis
        body: String,
    },
    /// Connection error or timeout
    TransportError {
        /// Transport error text
        message: String,
    },
    /// Status code outside the expected set
    UnexpectedStatus {
        /// Received status
        status: u16,
        /// Response body, kept for diagnosis
        body: String,
    },
    /// Never attempted because shutdown was requested
    Cancelled,
}

/// Payload-free tag of a [`BatchOutcome`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// See [`BatchOutcome::Success`]
    Success,
    /// See [`BatchOutcome::EmptyResult`]
    EmptyResult,
    /// See [`BatchOutcome::MalformedResponse`]
    MalformedResponse,
    /// See [`BatchOutcome::TransportError`]
    TransportError,
    /// See [`BatchOutcome::UnexpectedStatus`]
    UnexpectedStatus,
    /// See [`BatchOutcome::Cancelled`]
    Cancelled,
}

impl OutcomeKind {
    /// Label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Success => "success",
            OutcomeKind::EmptyResult => "empty_result",
            OutcomeKind::MalformedResponse => "malformed_response",
            OutcomeKind::TransportError => "transport_error",
            OutcomeKind::UnexpectedStatus => "unexpected_status",
            OutcomeKind::Cancelled => "cancelled",
        }
    }

    /// Whether this kind counts towards the run's failure total
    pub fn is_failure(&self) -> bool {
        !matches!(self, OutcomeKind::Success | OutcomeKind::EmptyResult)
    }
}

impl std::fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl BatchOutcome {
    /// Classify a list of events against the truncation threshold
    pub fn from_records(records: Vec<EventRecord>, max_results_per_query: usize) -> Self {
        if records.is_empty() {
            BatchOutcome::EmptyResult
        } else {
            let truncated = records.len() >= max_results_per_query;
            BatchOutcome::Success { records, truncated }
        }
    }

    /// Tag of this outcome
    pub fn kind(&self) -> OutcomeKind {
        match self {
            BatchOutcome::Success { .. } => OutcomeKind::Success,
            BatchOutcome::EmptyResult => OutcomeKind::EmptyResult,
            BatchOutcome::MalformedResponse { .. } => OutcomeKind::MalformedResponse,
            BatchOutcome::TransportError { .. } => OutcomeKind::TransportError,
            BatchOutcome::UnexpectedStatus { .. } => OutcomeKind::UnexpectedStatus,
            BatchOutcome::Cancelled => OutcomeKind::Cancelled,
        }
    }

    /// Whether this outcome counts as a failed batch
    pub fn is_failure(&self) -> bool {
        self.kind().is_failure()
    }

    /// Number of records carried (0 for anything but success)
    pub fn record_count(&self) -> usize {
        match self {
            BatchOutcome::Success { records, .. } => records.len(),
            _ => 0,
        }
    }

    /// Whether the batch hit the page cap
    pub fn is_truncated(&self) -> bool {
        matches!(self, BatchOutcome::Success { truncated: true, .. })
    }

    /// Failure description, `None` for success and empty results
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            BatchOutcome::Success { .. } | BatchOutcome::EmptyResult => None,
            BatchOutcome::MalformedResponse { reason, .. } => Some(format!("malformed response: {reason}")),
            BatchOutcome::TransportError { message } => Some(format!("transport error: {message}")),
            BatchOutcome::UnexpectedStatus { status, .. } => {
                Some(format!("unexpected status {status}"))
            }
            BatchOutcome::Cancelled => Some("cancelled before request".to_string()),
        }
    }

    /// Result to record on the originating request
    pub fn batch_result(&self) -> BatchResult {
        match self.failure_reason() {
            Some(reason) => BatchResult::Failed(reason),
            None => BatchResult::Records(self.record_count()),
        }
    }

    /// Move the records out, leaving the outcome's other information behind
    pub fn into_records(self) -> Vec<EventRecord> {
        match self {
            BatchOutcome::Success { records, .. } => records,
            _ => Vec::new(),
        }
    }
}
