//! Data output writers

use crate::EventRecord;

pub mod csv;
pub mod path;

pub use self::csv::{export_records, CsvRecordsWriter};
pub use self::path::{default_file_name, resolve_output_path};

/// Output writer errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV write error
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Buffer flush error
    #[error("flush error: {0}")]
    FlushError(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Generic output writer trait
pub trait OutputWriter {
    /// Flush any buffered data to disk
    fn flush(&mut self) -> OutputResult<()>;

    /// Close the writer and finalize output
    fn close(self) -> OutputResult<()>;
}

/// Trait for writing event records
pub trait RecordsWriter: OutputWriter {
    /// Write a single record to output
    fn write_record(&mut self, record: &EventRecord) -> OutputResult<()>;

    /// Write multiple records at once
    fn write_records(&mut self, records: &[EventRecord]) -> OutputResult<()> {
        for record in records {
            self.write_record(record)?;
        }
        Ok(())
    }
}
