// src/export.rs
// =============================================================================
// Writes scan results to a CSV file.
//
// Fixed schema, in this order:
//   Post ID, PDF URL, Post Date, Post Title, Post URL
//
// The header is always written, even when there are no rows, so an empty
// scan still produces a valid file for the merge step.
// =============================================================================

use std::path::Path;

use crate::error::{PipelineError, Result};
use crate::scan::ExportRow;

pub const EXPORT_HEADERS: [&str; 5] = ["Post ID", "PDF URL", "Post Date", "Post Title", "Post URL"];

// Same layout the CMS uses for post dates
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Writes the header and one line per row. Returns the number of rows written.
pub fn export_rows(rows: &[ExportRow], destination: &Path, delimiter: u8) -> Result<usize> {
    let file = std::fs::File::create(destination).map_err(|e| PipelineError::io(destination, e))?;

    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .from_writer(file);

    writer.write_record(EXPORT_HEADERS)?;

    for row in rows {
        writer.write_record([
            row.post_id.to_string(),
            row.pdf_url.clone(),
            row.post_date.format(DATE_FORMAT).to_string(),
            row.post_title.clone(),
            row.post_url.clone(),
        ])?;
    }

    writer.flush().map_err(|e| PipelineError::io(destination, e))?;
    Ok(rows.len())
}
