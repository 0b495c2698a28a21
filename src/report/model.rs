// src/report/model.rs
// =============================================================================
// The accessibility report produced by the external checking service.
//
// One JSON file per checked PDF:
//
//   {
//     "Summary": { "Description": "...", "Needs manual check": 2,
//                  "Passed manually": 0, "Failed manually": 0,
//                  "Skipped": 1, "Passed": 27, "Failed": 2 },
//     "Detailed Report": {
//       "Document": [ { "Rule": "Tagged PDF", "Status": "Passed",
//                       "Description": "The document is tagged" } ],
//       "Forms": [ ... ]
//     }
//   }
//
// Category order matters (it becomes column order), so "Detailed Report" is
// read through serde_json's order-preserving Map.
// =============================================================================

use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;

use crate::error::{PipelineError, Result};

/// Counters from the "Summary" section. Values are kept as JSON because the
/// service sends numbers, but they end up as CSV text anyway.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Summary {
    #[serde(rename = "Description")]
    pub description: Value,
    #[serde(rename = "Needs manual check")]
    pub needs_manual_check: Value,
    #[serde(rename = "Passed manually")]
    pub passed_manually: Value,
    #[serde(rename = "Failed manually")]
    pub failed_manually: Value,
    #[serde(rename = "Skipped")]
    pub skipped: Value,
    #[serde(rename = "Passed")]
    pub passed: Value,
    #[serde(rename = "Failed")]
    pub failed: Value,
}

impl Summary {
    /// The seven counters in merged-CSV column order
    pub fn cells(&self) -> [String; 7] {
        [
            cell(&self.description),
            cell(&self.needs_manual_check),
            cell(&self.passed_manually),
            cell(&self.failed_manually),
            cell(&self.skipped),
            cell(&self.passed),
            cell(&self.failed),
        ]
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RuleResult {
    #[serde(rename = "Rule")]
    pub rule: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Description")]
    pub description: String,
}

impl RuleResult {
    /// "Passed - The document is tagged"
    pub fn status_line(&self) -> String {
        format!("{} - {}", self.status, self.description)
    }
}

#[derive(Debug, Clone)]
pub struct Category {
    pub name: String,
    pub rules: Vec<RuleResult>,
}

#[derive(Debug, Clone)]
pub struct AccessibilityReport {
    pub summary: Summary,
    pub categories: Vec<Category>,
}

// Wire shape, before categories are typed
#[derive(Debug, Deserialize)]
struct RawReport {
    #[serde(rename = "Summary", default)]
    summary: Summary,
    #[serde(rename = "Detailed Report", default)]
    detailed_report: Map<String, Value>,
}

impl AccessibilityReport {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        let raw: RawReport = serde_json::from_str(text)?;

        let mut categories = Vec::with_capacity(raw.detailed_report.len());
        for (name, rules) in raw.detailed_report {
            let rules: Vec<RuleResult> = serde_json::from_value(rules)?;
            categories.push(Category { name, rules });
        }

        Ok(AccessibilityReport {
            summary: raw.summary,
            categories,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        AccessibilityReport::from_json(&text).map_err(|source| PipelineError::MalformedReport {
            path: path.to_path_buf(),
            source,
        })
    }

    /// ("Category/Rule", rule) pairs in report order
    pub fn entries(&self) -> impl Iterator<Item = (String, &RuleResult)> + '_ {
        self.categories.iter().flat_map(|category| {
            category
                .rules
                .iter()
                .map(move |rule| (format!("{}/{}", category.name, rule.rule), rule))
        })
    }
}

// JSON value -> CSV text: strings unquoted, null as blank
fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
