// src/report/columns.rs
// =============================================================================
// The dynamic "Category/Rule" columns of the merged CSV.
//
// Built once from a sample report, then only read: every row is laid out
// against the same ordered key list, so all rows have the same width no
// matter which rules their own report contains.
// =============================================================================

use std::collections::HashMap;

use super::model::AccessibilityReport;

#[derive(Debug, Clone, Default)]
pub struct ColumnSet {
    keys: Vec<String>,
    index: HashMap<String, usize>,
}

impl ColumnSet {
    /// Keys in first-seen order, duplicates dropped
    pub fn from_report(report: &AccessibilityReport) -> Self {
        let mut columns = ColumnSet::default();
        for (key, _) in report.entries() {
            columns.push(key);
        }
        columns
    }

    pub fn push(&mut self, key: String) {
        if !self.index.contains_key(&key) {
            self.index.insert(key.clone(), self.keys.len());
            self.keys.push(key);
        }
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
