//! Loading tabular input into a single record batch
//!
//! The format is chosen by file extension: `.csv` is read with Arrow's
//! CSV reader (header row required, schema inferred), `.parquet` with the
//! Parquet Arrow reader. Multiple batches are concatenated.

use crate::error::{MatchingError, Result};
use crate::utils::logging::log::{log_operation_complete, log_operation_start};
use arrow::compute::concat_batches;
use arrow::csv::ReaderBuilder;
use arrow::csv::reader::Format;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Rows inspected when inferring a CSV schema
const CSV_INFERENCE_ROWS: usize = 1000;

/// Supported input formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    /// Comma-delimited text with a header row
    Csv,
    /// Apache Parquet
    Parquet,
}

impl TableFormat {
    /// Detect the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("csv") => Ok(Self::Csv),
            Some("parquet") | Some("pq") => Ok(Self::Parquet),
            _ => Err(MatchingError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Unsupported table format: {}", path.display()),
            ))),
        }
    }
}

/// Load a CSV or Parquet file into one record batch
pub fn load_table(path: &Path) -> Result<RecordBatch> {
    let start = Instant::now();
    log_operation_start("Loading table from", path);

    let batch = match TableFormat::from_path(path)? {
        TableFormat::Csv => read_csv(path)?,
        TableFormat::Parquet => read_parquet(path)?,
    };

    log_operation_complete("loaded", path, batch.num_rows(), Some(start.elapsed()));
    Ok(batch)
}

/// Read a CSV file with an inferred schema
pub fn read_csv(path: &Path) -> Result<RecordBatch> {
    let mut file = File::open(path)?;
    let (schema, _) = Format::default()
        .with_header(true)
        .infer_schema(&mut file, Some(CSV_INFERENCE_ROWS))?;
    file.seek(SeekFrom::Start(0))?;

    let schema: SchemaRef = Arc::new(schema);
    let reader = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .build(file)?;

    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(concat_batches(&schema, &batches)?)
}

/// Read a Parquet file
pub fn read_parquet(path: &Path) -> Result<RecordBatch> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = builder.schema().clone();
    let reader = builder.build()?;

    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(concat_batches(&schema, &batches)?)
}

/// Write a record batch to a Parquet file
pub fn write_parquet(batch: &RecordBatch, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = parquet::arrow::ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}
