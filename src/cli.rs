// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Subcommands:
// - export:  scan sites for PDF links and write them to a CSV
// - count:   how many posts link to at least one PDF
// - inspect: list the PDF links of a single post
// - merge:   join a URL list with the accessibility reports into one CSV
// - missing: list URLs that have no report yet
//
// The scan-related subcommands share their "where do records come from"
// options through the flattened SourceArgs struct.
// =============================================================================

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "pdf-audit",
    version,
    about = "Find PDF links in CMS content and merge accessibility reports into CSV",
    long_about = "pdf-audit scans WordPress sites (or JSON dumps of them) for links to PDF \
                  documents, following short links, and merges the accessibility reports \
                  produced for those PDFs into a single spreadsheet."
)]
pub struct Cli {
    /// TOML configuration file (redirectors, production hosts, sites, ...)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export every (post, PDF link) pair to a CSV file
    ///
    /// Example: pdf-audit export pdfs.csv --post-types post,page --network
    Export {
        /// Output CSV file
        output: PathBuf,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Count posts that link to at least one PDF
    Count {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Show the PDF links found in one post
    ///
    /// Example: pdf-audit inspect 42 --site https://docs.example.com
    Inspect {
        /// Post ID
        post_id: u64,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Merge a URL list with the JSON reports in a directory
    ///
    /// Example: pdf-audit merge file_list_1.csv --reports output/PDFAccessibilityChecker
    Merge {
        /// Input CSV (url, date, title, post_url), or an `export` CSV
        input: PathBuf,

        /// Directory holding one JSON report per checked PDF
        #[arg(long)]
        reports: PathBuf,

        /// Output CSV (default: output/<input name>/output.csv)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// List input URLs that have no report in the directory
    Missing {
        /// Input CSV (url, date, title, post_url), or an `export` CSV
        input: PathBuf,

        /// Directory holding one JSON report per checked PDF
        #[arg(long)]
        reports: PathBuf,
    },
}

/// Where records come from and which ones to scan
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Comma-separated post types
    #[arg(long, value_delimiter = ',', default_value = "post")]
    pub post_types: Vec<String>,

    /// Scan every configured site instead of only the first one
    #[arg(long)]
    pub network: bool,

    /// Only posts published on or after this date (MM-DD-YYYY)
    #[arg(long)]
    pub start_date: Option<String>,

    /// Scan this site through its REST API instead of the configured sites
    #[arg(long, conflicts_with = "dump")]
    pub site: Option<String>,

    /// Read records from a JSON dump instead of the configured sites
    #[arg(long)]
    pub dump: Option<PathBuf>,
}
