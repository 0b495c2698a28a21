// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Set up logging and parse command-line arguments
// 2. Load the configuration (defaults if no --config)
// 3. Dispatch to the appropriate subcommand handler
// 4. Exit with proper code (0 = success, 1 = reports missing, 2 = error)
//
// Everything runs on one thread, one step at a time: the only waiting is on
// HTTP (short links, the REST API) and on files.
// =============================================================================

mod checker;
mod cli;
mod config;
mod content;
mod error;
mod export;
mod logging;
mod report;
mod scan;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use checker::{Classifier, HttpProbe, RedirectResolver};
use cli::{Cli, Commands, SourceArgs};
use config::Config;
use content::{ContentStore, DumpStore, WordPressStore};
use report::Aggregator;
use scan::{parse_start_date, ProductionHosts, ScanOptions, Scanner};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    logging::init()?;

    let cli = Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    let config = Config::load(cli.config.as_deref()).context("load configuration")?;

    match cli.command {
        Commands::Export { output, source } => handle_export(&config, &output, &source).await,
        Commands::Count { source } => handle_count(&config, &source).await,
        Commands::Inspect { post_id, source } => handle_inspect(&config, post_id, &source).await,
        Commands::Merge {
            input,
            reports,
            output,
        } => handle_merge(&config, &input, &reports, output),
        Commands::Missing { input, reports } => handle_missing(&config, &input, &reports),
    }
}

// Handles the 'export' subcommand
//
// The date is validated before anything touches the network or the output
// file, so a bad --start-date leaves no file behind.
async fn handle_export(config: &Config, output: &Path, source: &SourceArgs) -> Result<i32> {
    let options = scan_options(source)?;
    let stores = open_stores(config, source)?;
    let hosts = ProductionHosts::from_config(config);
    let mut scanner = build_scanner(config)?;

    info!("=== Get PDFs from sites ===");

    let mut rows = Vec::new();
    let mut posts = 0;
    for store in &stores {
        info!(site = %store.site_url(), "Processing site");
        let scan = scanner
            .scan_store(store.as_ref(), &options, &hosts)
            .await
            .with_context(|| format!("scan {}", store.site_url()))?;
        posts += scan.posts;
        rows.extend(scan.rows);
    }

    if posts == 0 {
        warn!("No posts with PDFs found");
    }
    let cache = scanner.resolver().cache();
    if !cache.is_empty() {
        info!(short_links = cache.len(), "Short links resolved");
    }

    let delimiter = config.csv.delimiter_byte()?;
    let written = export::export_rows(&rows, output, delimiter)
        .with_context(|| format!("write {}", output.display()))?;

    println!(
        "{} posts with PDFs ({} links) have been exported to {}",
        posts,
        written,
        output.display()
    );
    Ok(0)
}

// Handles the 'count' subcommand (stops at the first PDF in each post)
async fn handle_count(config: &Config, source: &SourceArgs) -> Result<i32> {
    let options = scan_options(source)?;
    let stores = open_stores(config, source)?;
    let mut scanner = build_scanner(config)?;

    let mut total = 0;
    for store in &stores {
        total += scanner.count_store(store.as_ref(), &options).await?;
    }

    println!("{} posts with PDFs found", total);
    Ok(0)
}

// Handles the 'inspect' subcommand
async fn handle_inspect(config: &Config, post_id: u64, source: &SourceArgs) -> Result<i32> {
    let stores = open_stores(config, source)?;
    let store = stores
        .first()
        .ok_or_else(|| anyhow!("No site to inspect"))?;
    let mut scanner = build_scanner(config)?;

    let record = store
        .record(post_id, &source.post_types)
        .await?
        .ok_or_else(|| anyhow!("Post {} not found on {}", post_id, store.site_url()))?;

    println!("{} ({})", record.title, record.permalink);
    let base = record.base_url(store.site_url());
    for link in scanner.target_links(&record.body, &base).await {
        println!("  {}", link);
    }
    Ok(0)
}

// Handles the 'merge' subcommand
fn handle_merge(
    config: &Config,
    input: &Path,
    reports: &Path,
    output: Option<PathBuf>,
) -> Result<i32> {
    let output = output.unwrap_or_else(|| default_merge_output(input));
    let delimiter = config.csv.delimiter_byte()?;

    let aggregator = Aggregator::new(reports, config.short_link_hosts.clone(), config.reports.strict)
        .context("read report directory")?;
    if aggregator.columns().is_empty() {
        warn!(reports = %reports.display(), "No readable report found, writing base columns only");
    }
    let inputs = report::read_input(input, delimiter)
        .with_context(|| format!("read {}", input.display()))?;

    let rows = aggregator.aggregate(inputs)?;
    let matched = rows.iter().filter(|row| row.report.is_some()).count();
    let written = report::write_merged(&output, &aggregator.headers(), &rows, delimiter)
        .with_context(|| format!("write {}", output.display()))?;

    println!(
        "Merged {} rows ({} with reports) into {}",
        written,
        matched,
        output.display()
    );
    Ok(0)
}

// Handles the 'missing' subcommand
//
// Exit code 1 when at least one URL still needs a report, so scripts can
// decide whether to run the checker again.
fn handle_missing(config: &Config, input: &Path, reports: &Path) -> Result<i32> {
    let delimiter = config.csv.delimiter_byte()?;
    let aggregator = Aggregator::new(reports, config.short_link_hosts.clone(), config.reports.strict)
        .context("read report directory")?;
    let inputs = report::read_input(input, delimiter)
        .with_context(|| format!("read {}", input.display()))?;

    let mut missing = 0;
    for record in &inputs {
        if aggregator.report_for(&record.url).is_none() {
            println!("{}", record.url);
            missing += 1;
        }
    }

    info!(total = inputs.len(), missing, "Report lookup done");
    Ok(if missing > 0 { 1 } else { 0 })
}

fn scan_options(source: &SourceArgs) -> Result<ScanOptions> {
    let start_date = source
        .start_date
        .as_deref()
        .map(parse_start_date)
        .transpose()?;

    Ok(ScanOptions {
        post_types: source.post_types.clone(),
        start_date,
    })
}

fn build_scanner(config: &Config) -> Result<Scanner<HttpProbe>> {
    let classifier = Classifier::from_config(config)?;
    let probe = HttpProbe::new(Duration::from_secs(config.redirects.timeout_secs))?;
    let resolver = RedirectResolver::new(probe, config.redirects.multiple_locations);
    Ok(Scanner::new(classifier, resolver))
}

// Picks the sites to scan: --dump, then --site, then the config list.
// Archived sites are skipped; without --network only the first one is used.
fn open_stores(config: &Config, source: &SourceArgs) -> Result<Vec<Box<dyn ContentStore>>> {
    let timeout = Duration::from_secs(config.redirects.timeout_secs);

    if let Some(dump) = &source.dump {
        return Ok(vec![Box::new(DumpStore::open(dump)?)]);
    }
    if let Some(site) = &source.site {
        return Ok(vec![Box::new(WordPressStore::new(site, timeout)?)]);
    }

    let mut stores: Vec<Box<dyn ContentStore>> = Vec::new();
    for site in &config.sites {
        if site.archived {
            warn!(site = %site.url, "Site archived, skipping");
            continue;
        }

        let store: Box<dyn ContentStore> = match &site.dump {
            Some(dump) => Box::new(DumpStore::open(dump)?),
            None => Box::new(WordPressStore::new(&site.url, timeout)?),
        };
        stores.push(store);

        if !source.network {
            break;
        }
    }

    if stores.is_empty() {
        return Err(anyhow!(
            "No site to scan: pass --site or --dump, or add [[sites]] to the config"
        ));
    }
    Ok(stores)
}

// output/<input file stem>/output.csv, next to where the tool runs
fn default_merge_output(input: &Path) -> PathBuf {
    let handle = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "merged".to_string());
    PathBuf::from("output").join(handle).join("output.csv")
}
