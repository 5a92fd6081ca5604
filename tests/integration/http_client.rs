//! Integration tests for InsightsHttpClient against a local mock server

use httpmock::prelude::*;
use insights_exporter::downloader::{classify_response, BatchOutcome};
use insights_exporter::fetcher::{FetcherError, InsightsHttpClient, QueryTransport};
use insights_exporter::request::{build_request, BatchRequest, QueryCredentials};
use insights_exporter::TimeWindow;
use std::time::Duration;

fn request_for(base_url: &str) -> BatchRequest {
    build_request(
        0,
        TimeWindow {
            since: 1_704_067_200,
            until: 1_704_070_800,
        },
        "SELECT * FROM PageView",
        &QueryCredentials::new("42", "secret-key"),
        base_url,
        &[200],
    )
}

#[tokio::test]
async fn test_sends_query_with_headers_and_encoded_nrql() {
    let server = MockServer::start_async().await;
    let request = request_for(&server.base_url());

    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v1/accounts/42/query")
                .query_param(
                    "nrql",
                    "SELECT * FROM PageView SINCE '2024-01-01 00:00:00 +0000' UNTIL '2024-01-01 01:00:00 +0000'",
                )
                .header("X-Query-Key", "secret-key")
                .header("Accept", "application/json");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"results":[{"events":[{"pageUrl":"/","duration":0.25}]}]}"#);
        })
        .await;

    let client = InsightsHttpClient::new(Duration::from_secs(5)).unwrap();
    let response = client.send(&request).await.unwrap();

    mock.assert_async().await;
    assert_eq!(response.status, 200);

    let outcome = classify_response(&request, response, 2000);
    assert_eq!(outcome.record_count(), 1);
}

#[tokio::test]
async fn test_error_status_is_returned_with_body() {
    let server = MockServer::start_async().await;
    let request = request_for(&server.base_url());

    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/accounts/42/query");
            then.status(401).body(r#"{"error":"Invalid query key"}"#);
        })
        .await;

    let client = InsightsHttpClient::new(Duration::from_secs(5)).unwrap();
    let response = client.send(&request).await.unwrap();

    assert_eq!(response.status, 401);
    assert_eq!(
        classify_response(&request, response, 2000),
        BatchOutcome::UnexpectedStatus {
            status: 401,
            body: r#"{"error":"Invalid query key"}"#.to_string()
        }
    );
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start_async().await;
    let request = request_for(&server.base_url());

    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/accounts/42/query");
            then.status(200)
                .delay(Duration::from_millis(500))
                .body(r#"{"results":[{"events":[]}]}"#);
        })
        .await;

    let client = InsightsHttpClient::new(Duration::from_millis(50)).unwrap();
    let result = client.send(&request).await;

    assert!(matches!(result, Err(FetcherError::Timeout(50))));
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    // Nothing listens on port 1
    let request = request_for("http://127.0.0.1:1");

    let client = InsightsHttpClient::new(Duration::from_secs(2)).unwrap();
    let result = client.send(&request).await;

    assert!(matches!(result, Err(FetcherError::NetworkError(_))));
}
