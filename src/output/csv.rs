//! CSV output writer
//!
//! Files are UTF-8 with a byte order mark and every field quoted, so
//! spreadsheet tools open them without an import dialog. Columns are the union
//! of all record keys in first-seen order.

use crate::EventRecord;
use csv::{QuoteStyle, Writer, WriterBuilder};
use serde_json::Value;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

use super::{OutputError, OutputResult, OutputWriter, RecordsWriter};

const DEFAULT_BUFFER_SIZE: usize = 8192; // 8KB buffer
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Column set of `records`: every key, in the order it is first seen
pub fn collect_columns(records: &[EventRecord]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

/// Text written for a single value
///
/// Strings are written verbatim, `null` as an empty field, and arrays or
/// objects as compact JSON.
pub fn render_value(value: &Value) -> OutputResult<String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s.clone()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Array(_) | Value::Object(_) => serde_json::to_string(value)
            .map_err(|e| OutputError::SerializationError(e.to_string())),
    }
}

/// CSV writer for event records
pub struct CsvRecordsWriter {
    writer: Writer<BufWriter<File>>,
    columns: Vec<String>,
    records_written: u64,
}

impl CsvRecordsWriter {
    /// Create the file (and missing parent directories) and write the BOM
    ///
    /// # Arguments
    /// * `path` - Output file path
    /// * `columns` - Header row; an empty set writes no header
    pub fn new<P: AsRef<Path>>(path: P, columns: Vec<String>) -> OutputResult<Self> {
        let path = path.as_ref();
        info!("Creating CSV writer: path={}", path.display());

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    OutputError::IoError(format!("Failed to create directory: {}", e))
                })?;
            }
        }

        let file = File::create(path)
            .map_err(|e| OutputError::IoError(format!("Failed to create file: {}", e)))?;

        let mut buf_writer = BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file);
        buf_writer
            .write_all(UTF8_BOM)
            .map_err(|e| OutputError::IoError(format!("Failed to write BOM: {}", e)))?;

        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .from_writer(buf_writer);

        if !columns.is_empty() {
            writer
                .write_record(&columns)
                .map_err(|e| OutputError::CsvError(format!("Failed to write header: {}", e)))?;
        }
        debug!(columns = columns.len(), "CSV writer created");

        Ok(Self {
            writer,
            columns,
            records_written: 0,
        })
    }

    /// Header columns
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Get number of records written so far
    pub fn records_written(&self) -> u64 {
        self.records_written
    }
}

impl RecordsWriter for CsvRecordsWriter {
    fn write_record(&mut self, record: &EventRecord) -> OutputResult<()> {
        let row = self
            .columns
            .iter()
            .map(|column| match record.get(column) {
                Some(value) => render_value(value),
                None => Ok(String::new()),
            })
            .collect::<OutputResult<Vec<String>>>()?;

        self.writer
            .write_record(&row)
            .map_err(|e| OutputError::CsvError(format!("Failed to write record: {}", e)))?;

        self.records_written += 1;

        // Flush periodically (every 1000 records)
        if self.records_written % 1000 == 0 {
            self.flush()?;
            debug!("Progress: {} records written", self.records_written);
        }

        Ok(())
    }
}

impl OutputWriter for CsvRecordsWriter {
    fn flush(&mut self) -> OutputResult<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::FlushError(format!("Failed to flush: {}", e)))
    }

    fn close(mut self) -> OutputResult<()> {
        self.flush()?;

        let buf_writer = self
            .writer
            .into_inner()
            .map_err(|e| OutputError::IoError(format!("Failed to get inner writer: {}", e)))?;

        let file = buf_writer
            .into_inner()
            .map_err(|e| OutputError::IoError(format!("Failed to get file handle: {}", e)))?;

        file.sync_all()
            .map_err(|e| OutputError::IoError(format!("Failed to sync file: {}", e)))?;

        info!(
            "CSV writer closed successfully: {} records written",
            self.records_written
        );
        Ok(())
    }
}

/// Write `records` to a CSV file at `path`
///
/// The file is created even when `records` is empty (BOM only).
///
/// # Returns
/// Number of records written
pub fn export_records<P: AsRef<Path>>(path: P, records: &[EventRecord]) -> OutputResult<usize> {
    let columns = collect_columns(records);
    let mut writer = CsvRecordsWriter::new(path, columns)?;
    writer.write_records(records)?;
    writer.close()?;
    Ok(records.len())
}
