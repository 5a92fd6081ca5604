//! CLI error types and conversions

use crate::fetcher::FetcherError;
use crate::output::OutputError;
use crate::window::InvalidRangeError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Requested time range cannot be split into windows
    #[error("invalid range: {0}")]
    InvalidRange(#[from] InvalidRangeError),

    /// Fetcher error
    #[error("fetcher error: {0}")]
    FetcherError(#[from] FetcherError),

    /// Output error
    #[error("output error: {0}")]
    OutputError(#[from] OutputError),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
