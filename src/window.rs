//! Window planning for batched range queries
//!
//! Splits `[start, end]` into consecutive windows of `size_seconds`. Every
//! window after the first starts one second after the previous window ends so
//! an event sitting exactly on a boundary is only returned once.
//!
//! The number of windows is `ceil((end - start) / size_seconds)`: a range that
//! is not an exact multiple of the window size gets a shorter final window
//! instead of losing its tail.
//!
//! ```rust
//! use insights_exporter::window::plan_windows;
//!
//! // 25 hours in 24 hour windows
//! let windows = plan_windows(0, 90_000, 86_400).unwrap();
//! assert_eq!(windows.len(), 2);
//! assert_eq!((windows[0].since, windows[0].until), (0, 86_400));
//! assert_eq!((windows[1].since, windows[1].until), (86_401, 90_000));
//! ```

use crate::TimeWindow;
use tracing::debug;

/// Seconds skipped between consecutive windows
pub const BOUNDARY_GAP_SECONDS: i64 = 1;

/// Smallest window that still leaves room after the boundary gap
pub const MIN_WINDOW_SECONDS: i64 = BOUNDARY_GAP_SECONDS + 1;

/// Upper bound on the number of windows in one run
///
/// A year of one-minute windows is about 525k requests, which already takes
/// days at the default pacing.
pub const MAX_WINDOWS: u64 = 1_000_000;

/// Planning-time input errors. Fatal to the whole run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidRangeError {
    /// Range end precedes range start
    #[error("range end ({end}) must not be before range start ({start})")]
    EndBeforeStart {
        /// Requested range start
        start: i64,
        /// Requested range end
        end: i64,
    },

    /// Window size is zero or negative
    #[error("window size must be positive, got {0} seconds")]
    NonPositiveWindow(i64),

    /// Window size leaves no room after the one-second boundary gap
    #[error("window size must be at least {min} seconds, got {size}")]
    WindowTooSmall {
        /// Requested window size
        size: i64,
        /// Smallest accepted size
        min: i64,
    },

    /// Range would need more windows than a run allows
    #[error("range needs {count} windows, more than the limit of {limit}; use a larger window")]
    TooManyWindows {
        /// Windows the range would need
        count: u64,
        /// Maximum windows per run
        limit: u64,
    },

    /// Range is too wide to be represented
    #[error("range from {start} to {end} overflows")]
    Overflow {
        /// Requested range start
        start: i64,
        /// Requested range end
        end: i64,
    },
}

/// Plan the windows covering `[start, end]`
///
/// # Arguments
/// * `start` - Range start (Unix timestamp in seconds)
/// * `end` - Range end (Unix timestamp in seconds)
/// * `size_seconds` - Nominal window size in seconds
///
/// # Returns
/// Windows in ascending order. Empty when `start == end`.
///
/// # Errors
/// Returns [`InvalidRangeError`] if `end < start`, `size_seconds` is below
/// [`MIN_WINDOW_SECONDS`], or the range needs more than [`MAX_WINDOWS`] windows
pub fn plan_windows(
    start: i64,
    end: i64,
    size_seconds: i64,
) -> Result<Vec<TimeWindow>, InvalidRangeError> {
    if end < start {
        return Err(InvalidRangeError::EndBeforeStart { start, end });
    }
    if size_seconds <= 0 {
        return Err(InvalidRangeError::NonPositiveWindow(size_seconds));
    }
    if size_seconds < MIN_WINDOW_SECONDS {
        return Err(InvalidRangeError::WindowTooSmall {
            size: size_seconds,
            min: MIN_WINDOW_SECONDS,
        });
    }

    let total = end
        .checked_sub(start)
        .ok_or(InvalidRangeError::Overflow { start, end })? as u64;
    let size = size_seconds as u64;
    let batch_count = total.div_ceil(size);
    if batch_count > MAX_WINDOWS {
        return Err(InvalidRangeError::TooManyWindows {
            count: batch_count,
            limit: MAX_WINDOWS,
        });
    }

    let mut windows: Vec<TimeWindow> = Vec::with_capacity(batch_count as usize);

    for batch in 0..batch_count {
        // offset <= total, so both fit back into i64 relative to start
        let offset = batch * size;
        let nominal_end = (offset + size).min(total);

        let mut since = start + offset as i64;
        if batch > 0 {
            since += BOUNDARY_GAP_SECONDS;
        }
        let until = start + nominal_end as i64;

        if since >= until {
            // A one-second tail leaves nothing after the gap:
            // fold it into the previous window so the range stays covered.
            if let Some(previous) = windows.last_mut() {
                previous.until = until;
            }
            continue;
        }

        windows.push(TimeWindow { since, until });
    }

    debug!(
        start,
        end,
        size_seconds,
        windows = windows.len(),
        "Planned query windows"
    );

    Ok(windows)
}
