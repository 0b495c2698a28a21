// src/report/aggregate.rs
// =============================================================================
// This module merges an input list of PDF URLs with the JSON reports the
// accessibility service produced for them.
//
// How it works:
// 1. List the report directory once (sorted, so "first match" is stable)
// 2. Take the first readable .json report as the sample and derive the
//    dynamic "Category/Rule" columns from it
// 3. For every input row, derive the expected report name from its URL and
//    look for a report file whose name contains it
// 4. Found: fill the summary counters and every rule column the report has
//    Not found: keep the input columns, leave everything else blank
//
// One output row per input row, always.
//
// Report names: the checker names its output after the PDF file, e.g.
//   https://example.com/files/My%20Guide.pdf -> "...My_Guide.pdf..."
// Short links have no file name, so https://aka.ms/abc123 is looked up as
// "abc123.pdf".
// =============================================================================

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use url::Url;

use super::columns::ColumnSet;
use super::model::{AccessibilityReport, Summary};
use crate::error::{PipelineError, Result};

/// Fixed columns of the merged CSV, before the dynamic rule columns
pub const BASE_HEADERS: [&str; 12] = [
    "url",
    "date",
    "title",
    "post_url",
    "Description",
    "Needs manual check",
    "Passed manually",
    "failed manually",
    "skipped",
    "passed",
    "failed",
    "Full Report",
];

/// One line of the input list. The export file's column names are accepted
/// too, so `export` output can be merged directly.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InputRecord {
    #[serde(alias = "PDF URL")]
    pub url: String,
    #[serde(alias = "Post Date", default)]
    pub date: String,
    #[serde(alias = "Post Title", default)]
    pub title: String,
    #[serde(alias = "Post URL", default)]
    pub post_url: String,
}

/// The report matched to an input row
#[derive(Debug, Clone)]
pub struct MatchedReport {
    /// File name only, e.g. "abc123.pdf.json"
    pub file_name: String,
    pub summary: Summary,
}

#[derive(Debug, Clone)]
pub struct MergedRow {
    pub input: InputRecord,
    pub report: Option<MatchedReport>,
    /// One slot per dynamic column, in ColumnSet order
    pub cells: Vec<Option<String>>,
}

impl MergedRow {
    /// The row as CSV fields, aligned with Aggregator::headers()
    pub fn to_record(&self) -> Vec<String> {
        let mut record = vec![
            self.input.url.clone(),
            self.input.date.clone(),
            self.input.title.clone(),
            self.input.post_url.clone(),
        ];

        match &self.report {
            Some(report) => {
                record.extend(report.summary.cells());
                record.push(report.file_name.clone());
            }
            None => record.extend(std::iter::repeat(String::new()).take(8)),
        }

        record.extend(self.cells.iter().map(|cell| cell.clone().unwrap_or_default()));
        record
    }
}

/// A listing of the report directory, taken once per run
#[derive(Debug, Clone)]
pub struct ReportDirectory {
    path: PathBuf,
    files: Vec<String>,
}

impl ReportDirectory {
    pub fn open(path: &Path) -> Result<Self> {
        let entries = std::fs::read_dir(path).map_err(|e| PipelineError::io(path, e))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| PipelineError::io(path, e))?;
            // Subdirectories are never reports
            if entry.path().is_file() {
                files.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        // read_dir order is platform-dependent; sorting makes "first match" stable
        files.sort();

        Ok(ReportDirectory {
            path: path.to_path_buf(),
            files,
        })
    }

    /// First .json file whose name contains `needle`
    pub fn find(&self, needle: &str) -> Option<&str> {
        if needle.is_empty() {
            return None;
        }
        // The checked PDFs may sit next to their reports; never match those
        self.json_files().find(|name| name.contains(needle))
    }

    pub fn json_files(&self) -> impl Iterator<Item = &str> {
        self.files.iter().filter(|name| name.ends_with(".json")).map(String::as_str)
    }

    pub fn path_of(&self, file_name: &str) -> PathBuf {
        self.path.join(file_name)
    }
}

/// The name a report for `url` is expected to contain
///
/// - short links: last path segment + ".pdf"
/// - everything else: the last path segment (query and fragment dropped)
/// - spaces and "%20" become "_"
pub fn expected_report_name(url: &str, short_link_hosts: &[String]) -> String {
    let is_short_link = match Url::parse(url) {
        Ok(parsed) => parsed
            .host_str()
            .map(|host| short_link_hosts.iter().any(|h| h.eq_ignore_ascii_case(host)))
            .unwrap_or(false),
        Err(_) => short_link_hosts.iter().any(|h| url.contains(h.as_str())),
    };

    // "https://example.com/a/b.pdf?dl=1" -> "b.pdf"
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let last_segment = without_query.rsplit('/').next().unwrap_or(without_query);

    // Short links name no file, so the checker saved the report as "<id>.pdf..."
    let name = if is_short_link && !last_segment.is_empty() {
        format!("{last_segment}.pdf")
    } else {
        last_segment.to_string()
    };

    name.replace(' ', "_").replace("%20", "_")
}

pub struct Aggregator {
    directory: ReportDirectory,
    columns: ColumnSet,
    short_link_hosts: Vec<String>,
    strict: bool,
}

impl Aggregator {
    /// Lists the directory and derives the dynamic columns.
    ///
    /// With `strict`, an unparsable report is an error; otherwise it is
    /// skipped with a warning.
    pub fn new(report_dir: &Path, short_link_hosts: Vec<String>, strict: bool) -> Result<Self> {
        let directory = ReportDirectory::open(report_dir)?;
        let mut aggregator = Aggregator {
            directory,
            columns: ColumnSet::default(),
            short_link_hosts,
            strict,
        };
        aggregator.columns = aggregator.derive_columns()?;
        Ok(aggregator)
    }

    fn derive_columns(&self) -> Result<ColumnSet> {
        // The first report that parses decides the columns for every row
        for file_name in self.directory.json_files() {
            match self.load(file_name)? {
                Some(report) => {
                    let columns = ColumnSet::from_report(&report);
                    info!(sample = file_name, columns = columns.len(), "Derived report columns");
                    return Ok(columns);
                }
                None => continue,
            }
        }

        Ok(ColumnSet::default())
    }

    // Ok(None) when the report is malformed and we're not strict
    fn load(&self, file_name: &str) -> Result<Option<AccessibilityReport>> {
        match AccessibilityReport::load(&self.directory.path_of(file_name)) {
            Ok(report) => Ok(Some(report)),
            Err(err @ PipelineError::MalformedReport { .. }) if !self.strict => {
                warn!(error = %err, "Skipping malformed report");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    pub fn headers(&self) -> Vec<String> {
        BASE_HEADERS
            .iter()
            .map(|h| h.to_string())
            .chain(self.columns.keys().iter().cloned())
            .collect()
    }

    pub fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    /// The report file for a URL, if one exists
    pub fn report_for(&self, url: &str) -> Option<&str> {
        let name = expected_report_name(url, &self.short_link_hosts);
        self.directory.find(&name)
    }

    pub fn merge_row(&self, input: InputRecord) -> Result<MergedRow> {
        // Every dynamic column starts blank
        let mut cells = vec![None; self.columns.len()];

        // Step 1: find the report file for this URL
        let file_name = match self.report_for(&input.url) {
            Some(name) => name.to_string(),
            None => {
                debug!(url = %input.url, "No report");
                return Ok(MergedRow {
                    input,
                    report: None,
                    cells,
                });
            }
        };

        // Step 2: parse it (a malformed one counts as "no report" unless strict)
        let report = match self.load(&file_name)? {
            Some(report) => report,
            None => {
                return Ok(MergedRow {
                    input,
                    report: None,
                    cells,
                })
            }
        };

        // Step 3: fill the rule columns this report has results for
        for (key, rule) in report.entries() {
            match self.columns.position(&key) {
                Some(i) => cells[i] = Some(rule.status_line()),
                None => debug!(%key, report = %file_name, "Rule not in sample report, dropped"),
            }
        }

        Ok(MergedRow {
            input,
            report: Some(MatchedReport {
                file_name,
                summary: report.summary,
            }),
            cells,
        })
    }

    /// One merged row per input record, in input order
    pub fn aggregate(&self, inputs: Vec<InputRecord>) -> Result<Vec<MergedRow>> {
        inputs.into_iter().map(|input| self.merge_row(input)).collect()
    }
}

/// Reads the input list (url, date, title, post_url)
pub fn read_input(path: &Path, delimiter: u8) -> Result<Vec<InputRecord>> {
    let file = std::fs::File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::Headers)
        .from_reader(file);

    // Column names are matched, not positions, so extra columns are fine
    let mut records = Vec::new();
    for record in reader.deserialize() {
        records.push(record?);
    }
    Ok(records)
}

/// Writes the merged CSV, creating parent directories as needed
pub fn write_merged(
    path: &Path,
    headers: &[String],
    rows: &[MergedRow],
    delimiter: u8,
) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }

    let file = std::fs::File::create(path).map_err(|e| PipelineError::io(path, e))?;
    // Headers are written by hand: they are dynamic, not a struct's fields
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .from_writer(file);

    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row.to_record())?;
    }
    writer.flush().map_err(|e| PipelineError::io(path, e))?;

    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "Summary": { "Description": "Issues found", "Needs manual check": 2,
                     "Passed manually": 0, "Failed manually": 0,
                     "Skipped": 1, "Passed": 27, "Failed": 2 },
        "Detailed Report": {
            "Document": [
                { "Rule": "Tagged PDF", "Status": "Passed", "Description": "The document is tagged PDF" },
                { "Rule": "Title", "Status": "Failed", "Description": "Document title is showing in title bar" }
            ],
            "Forms": [ { "Rule": "Tagged form fields", "Status": "Passed", "Description": "All form fields are tagged" } ]
        }
    }"#;

    const PARTIAL: &str = r#"{
        "Summary": { "Description": "OK", "Passed": 30, "Failed": 0 },
        "Detailed Report": {
            "Document": [ { "Rule": "Title", "Status": "Passed", "Description": "Title ok" } ],
            "Tables": [ { "Rule": "Headers", "Status": "Passed", "Description": "Not in sample" } ]
        }
    }"#;

    fn hosts() -> Vec<String> {
        vec!["aka.ms".to_string()]
    }

    fn input(url: &str) -> InputRecord {
        InputRecord {
            url: url.to_string(),
            date: "2024-01-01".to_string(),
            title: "T".to_string(),
            post_url: "https://site/t".to_string(),
        }
    }

    fn column(headers: &[String], record: &[String], name: &str) -> String {
        let i = headers.iter().position(|h| h == name).unwrap();
        record[i].clone()
    }

    #[test]
    fn test_expected_report_name() {
        assert_eq!(expected_report_name("https://aka.ms/abc123", &hosts()), "abc123.pdf");
        assert_eq!(
            expected_report_name("https://example.com/files/My%20Guide v2.pdf?dl=1", &hosts()),
            "My_Guide_v2.pdf"
        );
        assert_eq!(expected_report_name("https://example.com/a/b.pdf", &hosts()), "b.pdf");
        assert_eq!(expected_report_name("https://example.com/dir/", &hosts()), "");
    }

    #[test]
    fn test_short_link_with_report() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("abc123.pdf.json"), SAMPLE).unwrap();

        let aggregator = Aggregator::new(dir.path(), hosts(), false).unwrap();
        let rows = aggregator.aggregate(vec![input("https://aka.ms/abc123")]).unwrap();
        assert_eq!(rows.len(), 1);

        let headers = aggregator.headers();
        let record = rows[0].to_record();
        assert_eq!(record.len(), headers.len());
        assert_eq!(column(&headers, &record, "failed"), "2");
        assert_eq!(column(&headers, &record, "Full Report"), "abc123.pdf.json");
        assert_eq!(column(&headers, &record, "Description"), "Issues found");
        assert_eq!(
            column(&headers, &record, "Document/Title"),
            "Failed - Document title is showing in title bar"
        );
        assert_eq!(column(&headers, &record, "url"), "https://aka.ms/abc123");
    }

    #[test]
    fn test_no_matching_report_leaves_blanks() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("other.pdf.json"), SAMPLE).unwrap();

        let aggregator = Aggregator::new(dir.path(), hosts(), false).unwrap();
        let rows = aggregator.aggregate(vec![input("https://aka.ms/abc123")]).unwrap();
        let headers = aggregator.headers();
        let record = rows[0].to_record();

        assert_eq!(headers.len(), BASE_HEADERS.len() + 3);
        assert_eq!(record.len(), headers.len());
        assert_eq!(&record[..4], ["https://aka.ms/abc123", "2024-01-01", "T", "https://site/t"]);
        assert!(record[4..].iter().all(String::is_empty));
        assert_eq!(column(&headers, &record, "Full Report"), "");
    }

    #[test]
    fn test_empty_directory_keeps_row_count() {
        let dir = tempfile::tempdir().unwrap();
        let aggregator = Aggregator::new(dir.path(), hosts(), false).unwrap();
        assert_eq!(aggregator.headers().len(), BASE_HEADERS.len());

        let inputs: Vec<_> = (0..5).map(|i| input(&format!("https://example.com/{i}.pdf"))).collect();
        assert_eq!(aggregator.aggregate(inputs).unwrap().len(), 5);
        assert!(aggregator.aggregate(vec![]).unwrap().is_empty());
    }

    #[test]
    fn test_columns_come_from_sample_only() {
        let dir = tempfile::tempdir().unwrap();
        // "a-" sorts first, so it is the sample
        std::fs::write(dir.path().join("a-sample.pdf.json"), SAMPLE).unwrap();
        std::fs::write(dir.path().join("b-guide.pdf.json"), PARTIAL).unwrap();

        let aggregator = Aggregator::new(dir.path(), hosts(), false).unwrap();
        let headers = aggregator.headers();
        assert_eq!(
            &headers[BASE_HEADERS.len()..],
            ["Document/Tagged PDF", "Document/Title", "Forms/Tagged form fields"]
        );

        let rows = aggregator.aggregate(vec![input("https://example.com/b-guide.pdf")]).unwrap();
        let record = rows[0].to_record();
        assert_eq!(column(&headers, &record, "Document/Title"), "Passed - Title ok");
        // Present in the sample but not in this report
        assert_eq!(column(&headers, &record, "Document/Tagged PDF"), "");
        // Missing summary keys are blank, not "null"
        assert_eq!(column(&headers, &record, "skipped"), "");
        assert_eq!(column(&headers, &record, "passed"), "30");
        // "Tables/Headers" was not in the sample, so it has no column
        assert!(!headers.iter().any(|h| h == "Tables/Headers"));
    }

    #[test]
    fn test_malformed_report_skipped_unless_strict() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a-broken.pdf.json"), "{ nope").unwrap();
        std::fs::write(dir.path().join("b-good.pdf.json"), SAMPLE).unwrap();

        // The broken file is skipped as a sample too
        let lenient = Aggregator::new(dir.path(), hosts(), false).unwrap();
        assert_eq!(lenient.columns().len(), 3);
        let rows = lenient
            .aggregate(vec![input("https://example.com/a-broken.pdf")])
            .unwrap();
        assert!(rows[0].report.is_none());

        assert!(matches!(
            Aggregator::new(dir.path(), hosts(), true),
            Err(PipelineError::MalformedReport { .. })
        ));
    }

    #[test]
    fn test_pdf_next_to_its_report_is_not_a_report() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("abc.pdf"), b"%PDF-1.7").unwrap();
        std::fs::write(
            dir.path().join("accessibilityChecker-abc.pdf-2024-01-01T10-00-00.json"),
            SAMPLE,
        )
        .unwrap();

        for strict in [false, true] {
            let aggregator = Aggregator::new(dir.path(), hosts(), strict).unwrap();
            assert_eq!(
                aggregator.report_for("https://example.com/abc.pdf"),
                Some("accessibilityChecker-abc.pdf-2024-01-01T10-00-00.json")
            );

            let rows = aggregator.aggregate(vec![input("https://example.com/abc.pdf")]).unwrap();
            let report = rows[0].report.as_ref().unwrap();
            assert_eq!(report.file_name, "accessibilityChecker-abc.pdf-2024-01-01T10-00-00.json");
        }
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            Aggregator::new(&missing, hosts(), false),
            Err(PipelineError::Io { .. })
        ));
    }

    #[test]
    fn test_read_input_accepts_both_schemas() {
        let dir = tempfile::tempdir().unwrap();

        let plain = dir.path().join("plain.csv");
        std::fs::write(&plain, "url,date,title,post_url\nhttps://aka.ms/x,2024-01-01,T,https://site/t\n").unwrap();
        assert_eq!(read_input(&plain, b',').unwrap(), vec![InputRecord {
            url: "https://aka.ms/x".to_string(),
            date: "2024-01-01".to_string(),
            title: "T".to_string(),
            post_url: "https://site/t".to_string(),
        }]);

        let exported = dir.path().join("export.csv");
        std::fs::write(
            &exported,
            "Post ID,PDF URL,Post Date,Post Title,Post URL\n7,https://e.com/a.pdf,2024-01-01 00:00:00,A,https://site/a\n",
        )
        .unwrap();
        let records = read_input(&exported, b',').unwrap();
        assert_eq!(records[0].url, "https://e.com/a.pdf");
        assert_eq!(records[0].post_url, "https://site/a");
    }

    #[test]
    fn test_write_merged_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let aggregator = Aggregator::new(dir.path(), hosts(), false).unwrap();
        let rows = aggregator.aggregate(vec![input("https://aka.ms/x")]).unwrap();

        let out = dir.path().join("output").join("list").join("output.csv");
        assert_eq!(write_merged(&out, &aggregator.headers(), &rows, b',').unwrap(), 1);

        let text = std::fs::read_to_string(&out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "url,date,title,post_url,Description,Needs manual check,Passed manually,failed manually,skipped,passed,failed,Full Report"
        );
        assert_eq!(lines.next().unwrap(), "https://aka.ms/x,2024-01-01,T,https://site/t,,,,,,,,");
    }
}
