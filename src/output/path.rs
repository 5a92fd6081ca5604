//! Output path resolution
//!
//! Exports are named after the local date of the run, e.g.
//! `2024-03-01_NR_Data.csv`, unless an explicit path is given.

use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};

/// Suffix of generated export file names
pub const FILE_NAME_SUFFIX: &str = "_NR_Data.csv";

/// `<YYYY-MM-DD>_NR_Data.csv` for `date`
pub fn default_file_name(date: NaiveDate) -> String {
    format!("{}{}", date.format("%Y-%m-%d"), FILE_NAME_SUFFIX)
}

/// Path the export is written to
///
/// An explicit `output` wins; otherwise the default file name for today's
/// local date is placed in `output_dir`.
pub fn resolve_output_path(output: Option<&Path>, output_dir: &Path) -> PathBuf {
    match output {
        Some(path) => path.to_path_buf(),
        None => output_dir.join(default_file_name(Local::now().date_naive())),
    }
}
