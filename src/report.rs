//! Table export (Arrow/Parquet)
//!
//! Listing and analytics tables are plain Arrow record batches. This module
//! writes them to Parquet, reads them back, and renders them as text for
//! terminals and logs.

use std::fs::File;
use std::path::Path;

use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;

use crate::{Error, Result};

/// Write one table to a Parquet file, replacing any existing file.
///
/// # Errors
///
/// Returns [`Error::StorageError`] if the file cannot be created, and
/// [`Error::Parquet`] if encoding fails.
pub fn write_parquet<P: AsRef<Path>>(batch: &RecordBatch, path: P) -> Result<()> {
    let file = File::create(path.as_ref())
        .map_err(|e| Error::StorageError(format!("Failed to create Parquet file: {e}")))?;

    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

/// Load every record batch of a Parquet file.
///
/// # Errors
///
/// Returns [`Error::StorageError`] if the file cannot be opened,
/// [`Error::Parquet`] if it is not valid Parquet, and [`Error::Arrow`] if a
/// batch cannot be decoded.
pub fn load_parquet<P: AsRef<Path>>(path: P) -> Result<Vec<RecordBatch>> {
    let file = File::open(path.as_ref())
        .map_err(|e| Error::StorageError(format!("Failed to open Parquet file: {e}")))?;

    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    Ok(reader.collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Render tables as an ASCII grid.
///
/// # Errors
///
/// Returns [`Error::Arrow`] if a column cannot be formatted.
pub fn pretty(batches: &[RecordBatch]) -> Result<String> {
    Ok(pretty_format_batches(batches)?.to_string())
}
