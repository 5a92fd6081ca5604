//! Insights query response parser
//!
//! A successful NRQL event query answers with
//! `{"results": [{"events": [{...}, {...}]}], ...}`. Anything else is either not
//! JSON at all or JSON of the wrong shape; the two are reported separately so
//! the logs say which one happened.

use crate::EventRecord;
use serde_json::Value;

/// Why a response body could not be turned into events
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Body is not valid JSON
    #[error("body JSON parse failed: {0}")]
    InvalidJson(String),

    /// Body is JSON but has no `results[0]`
    #[error("no results found in body")]
    MissingResults,

    /// `results[0]` has no `events` array
    #[error("results[0] has no events array")]
    MissingEvents,

    /// An entry of `events` is not an object
    #[error("event {index} is not an object")]
    InvalidEvent {
        /// Position of the offending entry
        index: usize,
    },
}

/// Parse a response body into its event records
///
/// # Returns
/// The events of `results[0]`, in the order the API returned them. An empty
/// vector is a valid answer (no events in the window).
///
/// # Errors
/// Returns [`ParseError`] if the body is not JSON or does not have the event
/// query shape
pub fn parse_events(body: &str) -> Result<Vec<EventRecord>, ParseError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| ParseError::InvalidJson(e.to_string()))?;

    let first = value
        .get("results")
        .and_then(Value::as_array)
        .and_then(|results| results.first())
        .filter(|first| !first.is_null())
        .ok_or(ParseError::MissingResults)?;

    let events = first
        .get("events")
        .and_then(Value::as_array)
        .ok_or(ParseError::MissingEvents)?;

    events
        .iter()
        .enumerate()
        .map(|(index, event)| match event {
            Value::Object(map) => Ok(map.clone()),
            _ => Err(ParseError::InvalidEvent { index }),
        })
        .collect()
}
