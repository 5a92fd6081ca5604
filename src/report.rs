//! Aggregation and reporting of batch outcomes
//!
//! [`ReportBuilder`] accepts outcomes in any order and [`ReportBuilder::finish`]
//! lays them out by window, so the combined record set is always in ascending
//! time order even if batches completed out of order. Counters are derived
//! from the outcomes themselves rather than kept as shared state.

use crate::downloader::{BatchOutcome, OutcomeKind};
use crate::request::BatchRequest;
use crate::{EventRecord, TimeWindow};
use serde::Serialize;
use tracing::warn;

/// Per-batch line of the run summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    /// Request id
    pub id: usize,
    /// Request label
    pub label: String,
    /// Window queried
    pub window: TimeWindow,
    /// Outcome tag
    pub kind: OutcomeKind,
    /// Records returned (0 unless successful)
    pub count: usize,
    /// Failure reason, if the batch failed
    pub detail: Option<String>,
    /// Record count reached the per-query cap
    pub truncated: bool,
}

impl BatchSummary {
    /// `"Batch 0: 2024-01-01 00:00:00 until 2024-01-02 00:00:00 - 42"`
    pub fn line(&self) -> String {
        let result = match (&self.detail, self.truncated) {
            (Some(reason), _) => reason.clone(),
            (None, true) => format!("{} (truncated)", self.count),
            (None, false) => self.count.to_string(),
        };
        format!("{}: {} - {}", self.label, self.window, result)
    }
}

/// Final result of a run
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregateReport {
    /// Number of batches planned
    pub total_requests: usize,
    /// Batches that are neither successful nor empty
    pub total_failures: usize,
    /// Batches that returned no events
    pub empty_batches: usize,
    /// Batches that hit the per-query cap
    pub truncated_batches: usize,
    /// All records, in window order
    #[serde(skip)]
    pub combined_records: Vec<EventRecord>,
    /// One summary per batch, in window order
    pub batches: Vec<BatchSummary>,
}

impl AggregateReport {
    /// Number of aggregated records
    pub fn total_results(&self) -> usize {
        self.combined_records.len()
    }

    /// Whether every batch succeeded (empty results included)
    pub fn is_success(&self) -> bool {
        self.total_failures == 0
    }

    /// Process exit status: 0 when fully successful, 1 otherwise
    pub fn exit_status(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    /// One line per batch, in window order
    pub fn summary_lines(&self) -> Vec<String> {
        self.batches.iter().map(BatchSummary::line).collect()
    }

    /// Closing totals
    pub fn totals_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Total Requests: {}", self.total_requests),
            format!("Total Failures: {}", self.total_failures),
            format!("Total Results: {}", self.total_results()),
        ];
        if self.truncated_batches > 0 {
            lines.push(format!(
                "Truncated Batches: {} (consider a smaller window)",
                self.truncated_batches
            ));
        }
        lines
    }

    /// Terminal message for the run
    pub fn completion_message(&self) -> &'static str {
        if self.is_success() {
            "Completed successfully"
        } else {
            "Completed with failures"
        }
    }

    /// Summary as JSON (records excluded)
    pub fn to_json(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(object) = value.as_object_mut() {
            object.insert("total_results".to_string(), self.total_results().into());
            object.insert("success".to_string(), self.is_success().into());
        }
        value
    }
}

struct Entry {
    summary: BatchSummary,
    records: Vec<EventRecord>,
}

/// Incremental report construction
#[derive(Default)]
pub struct ReportBuilder {
    entries: Vec<Entry>,
}

impl ReportBuilder {
    /// Empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of `request`. Order of calls does not matter.
    pub fn record(&mut self, request: &BatchRequest, outcome: BatchOutcome) {
        let summary = BatchSummary {
            id: request.id,
            label: request.label.clone(),
            window: request.window,
            kind: outcome.kind(),
            count: outcome.record_count(),
            detail: outcome.failure_reason(),
            truncated: outcome.is_truncated(),
        };
        self.entries.push(Entry {
            summary,
            records: outcome.into_records(),
        });
    }

    /// Number of outcomes recorded so far
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finalize: order by window and concatenate records
    pub fn finish(mut self) -> AggregateReport {
        self.entries
            .sort_by_key(|entry| (entry.summary.window, entry.summary.id));

        let mut report = AggregateReport {
            total_requests: self.entries.len(),
            ..AggregateReport::default()
        };

        for entry in self.entries {
            let summary = entry.summary;
            if summary.kind.is_failure() {
                report.total_failures += 1;
            }
            if summary.kind == OutcomeKind::EmptyResult {
                report.empty_batches += 1;
            }
            if summary.truncated {
                report.truncated_batches += 1;
            }
            report.combined_records.extend(entry.records);
            report.batches.push(summary);
        }

        report
    }
}

/// Aggregate positional outcomes (`outcomes[i]` belongs to `requests[i]`)
///
/// A request without a matching outcome is reported as cancelled. Outcomes
/// beyond the last request are logged and dropped.
pub fn aggregate(requests: &[BatchRequest], outcomes: Vec<BatchOutcome>) -> AggregateReport {
    if outcomes.len() != requests.len() {
        warn!(
            requests = requests.len(),
            outcomes = outcomes.len(),
            "Outcome count does not match request count"
        );
    }

    let mut builder = ReportBuilder::new();
    let mut outcomes = outcomes.into_iter();

    for request in requests {
        let outcome = outcomes.next().unwrap_or(BatchOutcome::Cancelled);
        builder.record(request, outcome);
    }

    builder.finish()
}
