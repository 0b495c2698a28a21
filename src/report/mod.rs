// src/report/mod.rs
// =============================================================================
// This module turns per-document accessibility reports into one wide CSV.
//
// Submodules:
// - model: the report JSON (summary counters + rule-by-rule results)
// - columns: the ordered "Category/Rule" column set
// - aggregate: joins the input list with the report directory
// =============================================================================

mod aggregate;
mod columns;
mod model;

pub use aggregate::{read_input, write_merged, Aggregator};
