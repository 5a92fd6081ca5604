//! Export command implementation
//!
//! Plans the windows, runs every batch once under the pacing policy, prints
//! the per-batch summary and totals, and writes the combined records to CSV.

use crate::downloader::config::{
    DEFAULT_CONCURRENCY, DEFAULT_PACING_DELAY_MS, DEFAULT_TIMEOUT_MS, DEFAULT_WINDOW_SECONDS,
    MAX_CONCURRENCY, MAX_RESULTS_PER_QUERY,
};
use crate::downloader::{BatchExecutor, ExecutorConfig};
use crate::fetcher::InsightsHttpClient;
use crate::metrics;
use crate::output::{export_records, resolve_output_path};
use crate::report::{aggregate, AggregateReport};
use crate::request::{build_requests, QueryCredentials, DEFAULT_BASE_URL};
use crate::shutdown::SharedShutdown;
use crate::window::{plan_windows, MIN_WINDOW_SECONDS};
use chrono::{DateTime, NaiveDate, Utc};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::CliError;

/// Range used when `--start` is omitted
const DEFAULT_RANGE_SECONDS: i64 = 60 * 60 * 24;

/// Try to parse datetime from RFC3339 format
///
/// Handles both inputs with and without timezone designators:
/// - "2024-01-01T00:00:00Z" - explicit UTC
/// - "2024-01-01T00:00:00+01:00" - explicit offset
/// - "2024-01-01T00:00:00" - no timezone, assumed UTC
///
/// Returns timestamp in seconds, or None if parsing fails.
fn try_parse_datetime_rfc3339(input: &str) -> Option<i64> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.timestamp());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&format!("{input}Z")) {
        return Some(dt.timestamp());
    }

    None
}

/// Parse a start time from YYYY-MM-DD or RFC3339 datetime format.
///
/// For date-only format, uses start-of-day (00:00:00 UTC).
pub fn parse_start_time_flexible(input: &str) -> Result<i64, CliError> {
    if let Some(ts) = try_parse_datetime_rfc3339(input) {
        return Ok(ts);
    }

    let date = NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|e| CliError::InvalidArgument(format!("Invalid start time '{input}': {e}")))?;
    let datetime = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| CliError::InvalidArgument("Invalid start time".to_string()))?;
    Ok(datetime.and_utc().timestamp())
}

/// Parse an end time from YYYY-MM-DD or RFC3339 datetime format.
///
/// For date-only format, uses end-of-day (23:59:59 UTC) so the specified date
/// is fully included.
pub fn parse_end_time_flexible(input: &str) -> Result<i64, CliError> {
    if let Some(ts) = try_parse_datetime_rfc3339(input) {
        return Ok(ts);
    }

    let date = NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|e| CliError::InvalidArgument(format!("Invalid end time '{input}': {e}")))?;
    let datetime = date
        .and_hms_opt(23, 59, 59)
        .ok_or_else(|| CliError::InvalidArgument("Invalid end time".to_string()))?;
    Ok(datetime.and_utc().timestamp())
}

/// Parse and validate concurrency value
fn parse_concurrency(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if value == 0 {
        return Err("concurrency must be at least 1".to_string());
    }
    if value > MAX_CONCURRENCY {
        return Err(format!(
            "concurrency {value} exceeds maximum of {MAX_CONCURRENCY}"
        ));
    }
    Ok(value)
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}

/// New Relic Insights exporter CLI
#[derive(Parser, Debug)]
#[command(name = "insights-exporter")]
#[command(
    about = "Export New Relic Insights events over a time range to CSV",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// Insights query key
    #[arg(long, env = "NR_QUERY_KEY", hide_env_values = true)]
    pub api_key: String,

    /// New Relic account id
    #[arg(long, env = "NR_ACCOUNT_ID")]
    pub account_id: String,

    /// NRQL query without SINCE/UNTIL clauses (e.g. "SELECT * FROM Transaction")
    #[arg(long)]
    pub query: String,

    /// Start of the range (YYYY-MM-DD or RFC3339); defaults to one day before --end
    #[arg(long)]
    pub start: Option<String>,

    /// End of the range (YYYY-MM-DD or RFC3339); defaults to now
    #[arg(long)]
    pub end: Option<String>,

    /// Length of each query window in seconds
    ///
    /// Insights caps every query at 2000 events; shrink the window if batches
    /// are reported as truncated.
    #[arg(long, default_value_t = DEFAULT_WINDOW_SECONDS, value_parser = clap::value_parser!(i64).range(MIN_WINDOW_SECONDS..))]
    pub window_seconds: i64,

    /// Delay before every request, in milliseconds
    #[arg(long, default_value_t = DEFAULT_PACING_DELAY_MS)]
    pub pacing_ms: u64,

    /// Per-request timeout, in milliseconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_ms: u64,

    /// Event count at which a batch is flagged as truncated
    #[arg(long, default_value_t = MAX_RESULTS_PER_QUERY)]
    pub max_results: usize,

    /// Number of batches in flight (default: 1, max: 8)
    ///
    /// Request starts stay paced by --pacing-ms whatever the concurrency.
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY, value_parser = parse_concurrency)]
    pub concurrency: usize,

    /// HTTP status treated as success (repeatable)
    #[arg(long = "expected-status", default_values_t = [200u16], value_parser = clap::value_parser!(u16).range(100..=599))]
    pub expected_status: Vec<u16>,

    /// Insights API base URL (e.g. https://insights-api.eu.newrelic.com)
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Output file; defaults to <YYYY-MM-DD>_NR_Data.csv in --output-dir
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Directory for the default output file
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Output format (json or human)
    #[arg(long, default_value = "human")]
    pub output_format: OutputFormat,

    /// Serve Prometheus metrics on this address (e.g. 127.0.0.1:9000)
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,
}

impl Cli {
    /// Resolve `--start`/`--end` into Unix seconds
    pub fn time_range(&self) -> Result<(i64, i64), CliError> {
        let end = match &self.end {
            Some(end) => parse_end_time_flexible(end)?,
            None => Utc::now().timestamp(),
        };
        let start = match &self.start {
            Some(start) => parse_start_time_flexible(start)?,
            None => end - DEFAULT_RANGE_SECONDS,
        };
        Ok((start, end))
    }

    /// Executor settings from the flags
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig::default()
            .with_pacing_delay(Duration::from_millis(self.pacing_ms))
            .with_request_timeout(Duration::from_millis(self.timeout_ms))
            .with_max_results_per_query(self.max_results)
            .with_concurrency(self.concurrency)
    }

    fn validate(&self) -> Result<(), CliError> {
        if self.api_key.trim().is_empty() {
            return Err(CliError::InvalidArgument("api key must not be empty".to_string()));
        }
        if self.account_id.trim().is_empty() {
            return Err(CliError::InvalidArgument(
                "account id must not be empty".to_string(),
            ));
        }
        if self.query.trim().is_empty() {
            return Err(CliError::InvalidArgument("query must not be empty".to_string()));
        }
        if self.max_results == 0 {
            return Err(CliError::InvalidArgument(
                "max results must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Run the export
    ///
    /// Batch failures do not make this return an error: they are counted in
    /// the returned report. Errors are reserved for invalid input and a
    /// failed export.
    pub async fn execute(&self, shutdown: SharedShutdown) -> Result<AggregateReport, CliError> {
        self.validate()?;
        let (start, end) = self.time_range()?;
        let windows = plan_windows(start, end, self.window_seconds)?;

        let credentials = QueryCredentials::new(self.account_id.trim(), self.api_key.trim());
        let mut requests = build_requests(
            &windows,
            &self.query,
            &credentials,
            &self.base_url,
            &self.expected_status,
        );

        let config = self.executor_config();
        let transport = Arc::new(InsightsHttpClient::new(config.request_timeout)?);
        let progress = create_progress_bar(requests.len() as u64, self.output_format);
        let executor = BatchExecutor::new(transport, config)
            .with_shutdown(shutdown.clone())
            .with_progress(progress.clone());

        let outcomes = executor.execute_all(&mut requests).await;
        progress.finish_and_clear();

        if shutdown.is_shutdown_requested() {
            warn!("Shutdown requested, exporting what was gathered");
        }

        let report = aggregate(&requests, outcomes);
        if self.output_format == OutputFormat::Human {
            output_human_summary(&report);
        }

        let output_path = resolve_output_path(self.output.as_deref(), &self.output_dir);
        let written = export_records(&output_path, &report.combined_records)?;
        metrics::record_export(written);
        info!(records = written, path = %output_path.display(), "Export written");

        match self.output_format {
            OutputFormat::Json => output_json(&report, &output_path),
            OutputFormat::Human => output_human_completion(&report, &output_path),
        }

        Ok(report)
    }
}

/// Output result as JSON
fn output_json(report: &AggregateReport, output_path: &Path) {
    let mut output = report.to_json();
    output["output_path"] = serde_json::Value::String(output_path.display().to_string());
    println!("{output}");
}

fn output_human_summary(report: &AggregateReport) {
    for line in report.summary_lines() {
        println!("{line}");
    }
    println!();
    for line in report.totals_lines() {
        println!("{line}");
    }
}

fn output_human_completion(report: &AggregateReport, output_path: &Path) {
    println!("Output: {}", output_path.display());
    println!("{}", report.completion_message());
}

/// Create progress bar with style
fn create_progress_bar(total_batches: u64, format: OutputFormat) -> ProgressBar {
    if format == OutputFormat::Json {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(total_batches);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
    ) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message("Exporting batches");
    pb
}
