//! Integration tests for logging and tracing
//!
//! Each test installs a scoped subscriber that writes into a shared buffer,
//! so the rendered lines can be inspected.

use std::io;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn emit_batch_events() {
    let batch = "Batch 0";
    let count = 2000usize;
    let status = 503u16;

    info!(
        target: "insights_exporter",
        batch,
        since = 1_704_067_200i64,
        until = 1_704_153_600i64,
        "Requesting {}",
        batch
    );
    warn!(target: "insights_exporter", batch, count, "{} - Maximum number of events returned ({})", batch, count);
    error!(target: "insights_exporter", batch, status, body = "unavailable", "{} - Unexpected status {}", batch, status);
    debug!(target: "insights_exporter", batch, "Pacing before request");
}

#[test]
fn test_text_format_carries_batch_fields() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("insights_exporter=info"))
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    tracing::subscriber::with_default(subscriber, emit_batch_events);

    let output = logs.contents();
    assert!(output.contains("Requesting Batch 0"), "{output}");
    assert!(output.contains(r#"batch="Batch 0""#), "{output}");
    assert!(output.contains("since=1704067200"), "{output}");
    assert!(output.contains("until=1704153600"), "{output}");
    assert!(output.contains("count=2000"), "{output}");
    assert!(output.contains("status=503"), "{output}");
    assert!(output.contains("WARN"), "{output}");
    assert!(output.contains("ERROR"), "{output}");
}

#[test]
fn test_json_format_carries_batch_fields() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::new("insights_exporter=info"))
        .with_writer(move || writer.clone())
        .finish();

    tracing::subscriber::with_default(subscriber, emit_batch_events);

    let output = logs.contents();
    let lines: Vec<serde_json::Value> = output
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 3, "{output}");

    assert_eq!(lines[0]["level"], "INFO");
    assert_eq!(lines[0]["fields"]["batch"], "Batch 0");
    assert_eq!(lines[0]["fields"]["since"], 1_704_067_200i64);
    assert_eq!(lines[1]["fields"]["count"], 2000);
    assert_eq!(lines[2]["level"], "ERROR");
    assert_eq!(lines[2]["fields"]["status"], 503);
    assert_eq!(lines[2]["fields"]["body"], "unavailable");
}

#[test]
fn test_env_filter_drops_events_below_directive() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("insights_exporter=warn"))
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    tracing::subscriber::with_default(subscriber, emit_batch_events);

    let output = logs.contents();
    assert!(!output.contains("Requesting Batch 0"), "{output}");
    assert!(!output.contains("Pacing before request"), "{output}");
    assert!(output.contains("Maximum number of events returned (2000)"), "{output}");
    assert!(output.contains("Unexpected status 503"), "{output}");
}

#[test]
fn test_debug_directive_enables_pacing_events() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("warn,insights_exporter=debug"))
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    tracing::subscriber::with_default(subscriber, emit_batch_events);

    assert!(logs.contents().contains("Pacing before request"));
}

#[test]
fn test_env_filter_directives_parse() {
    for directive in [
        "info",
        "insights_exporter=debug",
        "warn,insights_exporter=trace",
    ] {
        assert!(EnvFilter::try_new(directive).is_ok(), "{directive}");
    }
}
