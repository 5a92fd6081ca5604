//! CLI end-to-end tests against a local mock server

use assert_cmd::Command;
use httpmock::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

const EVENTS: &str = r#"{"results":[{"events":[{"appName":"shop","duration":0.5},{"appName":"shop","duration":1.5}]}]}"#;

fn exporter(server: &MockServer, output: &std::path::Path) -> Command {
    exporter_over(server, output, "2024-01-01T00:00:00Z", "2024-01-01T02:00:00Z")
}

fn exporter_over(server: &MockServer, output: &std::path::Path, start: &str, end: &str) -> Command {
    let mut cmd = Command::cargo_bin("insights-exporter").unwrap();
    cmd.env_remove("NR_QUERY_KEY")
        .env_remove("NR_ACCOUNT_ID")
        .env("RUST_LOG", "insights_exporter=warn")
        .args([
            "--api-key",
            "key",
            "--account-id",
            "42",
            "--query",
            "SELECT * FROM Transaction",
            "--start",
            start,
            "--end",
            end,
            "--window-seconds",
            "3600",
            "--pacing-ms",
            "0",
            "--base-url",
        ])
        .arg(server.base_url())
        .arg("--output")
        .arg(output);
    cmd
}

#[test]
fn test_successful_export() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/v1/accounts/42/query")
            .header("X-Query-Key", "key");
        then.status(200).body(EVENTS);
    });
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.csv");

    exporter(&server, &output)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Batch 0: 2024-01-01 00:00:00 until 2024-01-01 01:00:00 - 2",
        ))
        .stdout(predicate::str::contains(
            "Batch 1: 2024-01-01 01:00:01 until 2024-01-01 02:00:00 - 2",
        ))
        .stdout(predicate::str::contains("Total Requests: 2"))
        .stdout(predicate::str::contains("Total Failures: 0"))
        .stdout(predicate::str::contains("Total Results: 4"))
        .stdout(predicate::str::contains("Completed successfully"));

    let bytes = std::fs::read(&output).unwrap();
    assert!(bytes.starts_with(b"\xEF\xBB\xBF"));
    let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
    assert_eq!(text.lines().count(), 5);
    assert_eq!(text.lines().next().unwrap(), r#""appName","duration""#);
}

#[test]
fn test_failures_exit_nonzero_and_still_write_file() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v1/accounts/42/query");
        then.status(503).body("unavailable");
    });
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.csv");

    exporter(&server, &output)
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("unexpected status 503"))
        .stdout(predicate::str::contains("Total Failures: 2"))
        .stdout(predicate::str::contains("Total Results: 0"))
        .stdout(predicate::str::contains("Completed with failures"));

    assert_eq!(std::fs::read(&output).unwrap(), b"\xEF\xBB\xBF");
}

#[test]
fn test_json_output_format() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v1/accounts/42/query");
        then.status(200).body(EVENTS);
    });
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.csv");

    let assert = exporter(&server, &output)
        .args(["--output-format", "json"])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let json: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["total_requests"], 2);
    assert_eq!(json["total_results"], 4);
    assert_eq!(json["batches"][0]["kind"], "success");
    assert_eq!(json["output_path"], output.display().to_string());
}

#[test]
fn test_inverted_range_is_fatal() {
    let server = MockServer::start();
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.csv");

    exporter_over(&server, &output, "2024-01-02T00:00:00Z", "2024-01-01T00:00:00Z")
        .assert()
        .failure()
        .code(1);

    assert!(!output.exists());
}

#[test]
fn test_missing_api_key_is_rejected() {
    let mut cmd = Command::cargo_bin("insights-exporter").unwrap();
    cmd.env_remove("NR_QUERY_KEY")
        .env_remove("NR_ACCOUNT_ID")
        .args(["--account-id", "42", "--query", "SELECT 1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--api-key"));
}

#[test]
fn test_help_lists_flags() {
    Command::cargo_bin("insights-exporter")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--window-seconds"))
        .stdout(predicate::str::contains("--pacing-ms"))
        .stdout(predicate::str::contains("--expected-status"));
}
