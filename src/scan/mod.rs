// src/scan/mod.rs
// =============================================================================
// This module handles scanning content for PDF links.
//
// Features:
// - Pulls records from any ContentStore
// - Optional start-date filter (MM-DD-YYYY, inclusive)
// - Short-link resolution through a per-run cache
// - Permalinks rewritten from the scanning environment to production
// =============================================================================

mod permalink;
mod scanner;

pub use permalink::ProductionHosts;
pub use scanner::{parse_start_date, ExportRow, ScanOptions, Scanner};
