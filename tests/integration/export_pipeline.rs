//! End-to-end library pipeline: plan, execute, aggregate, export

use httpmock::prelude::*;
use insights_exporter::downloader::{BatchExecutor, ExecutorConfig};
use insights_exporter::fetcher::InsightsHttpClient;
use insights_exporter::output::export_records;
use insights_exporter::report::aggregate;
use insights_exporter::request::{build_requests, QueryCredentials};
use insights_exporter::window::plan_windows;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const DAY: i64 = 86_400;
const JAN_1: i64 = 1_704_067_200;

#[tokio::test]
async fn test_partial_failure_still_exports_gathered_records() {
    let server = MockServer::start_async().await;

    // Day 1 succeeds, day 2 is empty, day 3 errors
    server
        .mock_async(|when, then| {
            when.method(GET).query_param(
                "nrql",
                "SELECT * FROM Transaction SINCE '2024-01-01 00:00:00 +0000' UNTIL '2024-01-02 00:00:00 +0000'",
            );
            then.status(200).body(
                r#"{"results":[{"events":[{"name":"a","duration":1},{"name":"b","host":"web-1"}]}]}"#,
            );
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).query_param(
                "nrql",
                "SELECT * FROM Transaction SINCE '2024-01-02 00:00:01 +0000' UNTIL '2024-01-03 00:00:00 +0000'",
            );
            then.status(200).body(r#"{"results":[{"events":[]}]}"#);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).query_param(
                "nrql",
                "SELECT * FROM Transaction SINCE '2024-01-03 00:00:01 +0000' UNTIL '2024-01-04 00:00:00 +0000'",
            );
            then.status(500).body("internal error");
        })
        .await;

    let windows = plan_windows(JAN_1, JAN_1 + 3 * DAY, DAY).unwrap();
    assert_eq!(windows.len(), 3);

    let mut requests = build_requests(
        &windows,
        "SELECT * FROM Transaction",
        &QueryCredentials::new("42", "key"),
        &server.base_url(),
        &[200],
    );

    let config = ExecutorConfig::default()
        .with_pacing_delay(Duration::from_millis(10))
        .with_request_timeout(Duration::from_secs(5));
    let transport = Arc::new(InsightsHttpClient::new(config.request_timeout).unwrap());
    let outcomes = BatchExecutor::new(transport, config)
        .execute_all(&mut requests)
        .await;

    let report = aggregate(&requests, outcomes);
    assert_eq!(report.total_requests, 3);
    assert_eq!(report.total_failures, 1);
    assert_eq!(report.empty_batches, 1);
    assert_eq!(report.total_results(), 2);
    assert_eq!(report.exit_status(), 1);

    let lines = report.summary_lines();
    assert_eq!(
        lines[0],
        "Batch 0: 2024-01-01 00:00:00 until 2024-01-02 00:00:00 - 2"
    );
    assert!(lines[2].contains("unexpected status 500"));

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("export.csv");
    let written = export_records(&path, &report.combined_records).unwrap();
    assert_eq!(written, 2);

    let text = std::fs::read_to_string(&path).unwrap();
    let text = text.trim_start_matches('\u{feff}');
    let rows: Vec<&str> = text.lines().collect();
    assert_eq!(rows[0], r#""name","duration","host""#);
    assert_eq!(rows[1], r#""a","1","""#);
    assert_eq!(rows[2], r#""b","","web-1""#);
}
