//! Append-only CSV table persistence.
//!
//! A result table is a plain CSV file owned by the user. Saving appends: the
//! existing rows are read back in full, the new batch is concatenated after
//! them, and the whole file is rewritten. O(existing size) per call, which is
//! fine for the small per-record batches the pipeline produces, and not safe
//! under concurrent writers.

use crate::error::{PaperpipeError, Result};
use crate::paper::PaperRecord;
use std::path::Path;

/// Append `records` to the table at `path`, creating it if absent.
///
/// Call order is preserved as row order; existing rows always come first.
///
/// # Errors
///
/// Fails if the path is unwritable or the existing file does not parse as
/// the record schema. Missing or mismatched columns are not reconciled.
pub fn save(records: &[PaperRecord], path: &Path) -> Result<()> {
    let mut rows = if path.exists() {
        load(path)?
    } else {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Vec::new()
    };
    rows.extend_from_slice(records);

    let mut writer = csv::Writer::from_path(path)?;
    for row in &rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a table fully into memory.
///
/// # Errors
///
/// Returns [`PaperpipeError::TableNotFound`] if the file is absent and
/// [`PaperpipeError::Csv`] if any row fails to deserialize.
pub fn load(path: &Path) -> Result<Vec<PaperRecord>> {
    if !path.exists() {
        return Err(PaperpipeError::TableNotFound(path.to_path_buf()));
    }
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

/// Number of rows in a table, zero if the file is absent.
pub fn row_count(path: &Path) -> Result<usize> {
    match load(path) {
        Ok(rows) => Ok(rows.len()),
        Err(PaperpipeError::TableNotFound(_)) => Ok(0),
        Err(e) => Err(e),
    }
}
