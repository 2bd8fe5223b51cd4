//! CSV export of search results.

use crate::error::Result;
use crate::paper::PaperRecord;
use std::path::Path;
use tracing::info;

/// Write records to `path` with a header row, one row per record.
///
/// Enrichment fields that are absent are written as empty cells. Nothing
/// is written for an empty result.
pub fn write_csv(path: &Path, records: &[PaperRecord]) -> Result<usize> {
    if records.is_empty() {
        info!(path = %path.display(), "No records to export");
        return Ok(0);
    }

    let mut wtr = csv::WriterBuilder::new().has_headers(true).from_path(path)?;
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;

    info!(path = %path.display(), rows = records.len(), "Saved CSV");
    Ok(records.len())
}
