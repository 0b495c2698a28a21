// src/scan/scanner.rs
// =============================================================================
// This module finds PDF links in content records.
//
// How it works:
// 1. Ask the content store for records (post types, optional start date)
// 2. Pull every <a href> out of each record's body
// 3. Classify each link:
//    - a PDF URL is accepted as-is
//    - a short link is resolved (one HEAD request, cached for the run) and
//      accepted only if it lands on a PDF; the *short* link is what we keep
//    - everything else is dropped
// 4. Emit one ExportRow per distinct (record, link) pair
//
// There are two ways to consume a record:
// - target_links(): the full, de-duplicated list (for the CSV export)
// - has_target(): stops at the first PDF (for counting)
//
// Rust concepts:
// - HashSet: tracking (record, link) pairs we've already emitted
// - &mut self across .await: the scanner owns the resolver and its cache
// - &dyn ContentStore: any store works, chosen at runtime
// =============================================================================

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashSet;
use tracing::{debug, info};
use url::Url;

use super::permalink::{PermalinkRewriter, ProductionHosts};
use crate::checker::{extract_hrefs, Classification, Classifier, HeaderProbe, RedirectResolver};
use crate::content::{ContentRecord, ContentStore};
use crate::error::{PipelineError, Result};

/// One line of the export: a record and one PDF link found in it
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub post_id: u64,
    pub pdf_url: String,
    pub post_date: NaiveDateTime,
    pub post_title: String,
    /// Permalink, already rewritten to the production host
    pub post_url: String,
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub post_types: Vec<String>,
    /// Only records published on or after this date
    pub start_date: Option<NaiveDate>,
}

/// Result of scanning one site
#[derive(Debug, Default)]
pub struct SiteScan {
    pub rows: Vec<ExportRow>,
    /// Records that contributed at least one row
    pub posts: usize,
}

/// Parses a MM-DD-YYYY date such as "03-01-2024"
pub fn parse_start_date(input: &str) -> Result<NaiveDate> {
    let invalid = || PipelineError::InvalidDate {
        input: input.to_string(),
    };

    // chrono accepts "3-1-2024" too; insist on the full shape
    let shape_ok = input.len() == 10
        && input
            .char_indices()
            .all(|(i, c)| if i == 2 || i == 5 { c == '-' } else { c.is_ascii_digit() });
    if !shape_ok {
        return Err(invalid());
    }

    NaiveDate::parse_from_str(input, "%m-%d-%Y").map_err(|_| invalid())
}

pub struct Scanner<P> {
    classifier: Classifier,
    resolver: RedirectResolver<P>,
}

impl<P: HeaderProbe> Scanner<P> {
    pub fn new(classifier: Classifier, resolver: RedirectResolver<P>) -> Self {
        Scanner {
            classifier,
            resolver,
        }
    }

    pub fn resolver(&self) -> &RedirectResolver<P> {
        &self.resolver
    }

    // Is this link (or where it redirects to) a target document?
    async fn accepts(&mut self, url: &str) -> bool {
        match self.classifier.classify(url) {
            Classification::DirectMatch => true,
            // One hop only: the destination must itself look like a PDF
            Classification::PotentialRedirect => match self.resolver.resolve(url).await {
                Some(destination) => {
                    self.classifier.classify(&destination) == Classification::DirectMatch
                }
                None => false,
            },
            Classification::NotATarget => false,
        }
    }

    /// Every distinct target link in a body, in order of first appearance.
    /// Relative links are resolved against `base` (the record's URL).
    pub async fn target_links(&mut self, body: &str, base: &Url) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for href in extract_hrefs(body, base) {
            // Repeats are skipped before any lookup happens
            if !seen.insert(href.clone()) {
                continue;
            }
            if self.accepts(&href).await {
                debug!(url = %href, "Accepted");
                links.push(href);
            } else {
                debug!(url = %href, "Skipped");
            }
        }

        links
    }

    /// True as soon as one target link is found
    pub async fn has_target(&mut self, body: &str, base: &Url) -> bool {
        for href in extract_hrefs(body, base) {
            // First hit wins; later links are never classified or resolved
            if self.accepts(&href).await {
                return true;
            }
        }
        false
    }

    /// Turns records into export rows, one per distinct (record, link)
    pub async fn scan_records(
        &mut self,
        records: &[ContentRecord],
        site_url: &Url,
        rewriter: &PermalinkRewriter,
    ) -> SiteScan {
        // (record id, link) pairs already written, across all records, so a
        // record listed twice by the store still yields each link once
        let mut emitted: HashSet<(u64, String)> = HashSet::new();
        let mut scan = SiteScan::default();

        for record in records {
            let base = record.base_url(site_url);
            let links = self.target_links(&record.body, &base).await;
            let mut contributed = false;

            for link in links {
                if !emitted.insert((record.id, link.clone())) {
                    continue;
                }
                contributed = true;

                // The permalink points at the scanning environment; the
                // export should carry the production URL
                scan.rows.push(ExportRow {
                    post_id: record.id,
                    pdf_url: link,
                    post_date: record.date,
                    post_title: record.title.clone(),
                    post_url: rewriter.rewrite(&record.permalink),
                });
            }

            // A post counts once, however many PDFs it links to
            if contributed {
                scan.posts += 1;
            }
        }

        scan
    }

    /// Queries one store and scans everything it returns
    pub async fn scan_store(
        &mut self,
        store: &dyn ContentStore,
        options: &ScanOptions,
        hosts: &ProductionHosts,
    ) -> Result<SiteScan> {
        // Step 1: fetch the records (post types and start date applied by the store)
        let records = store.query(&options.post_types, options.start_date).await?;
        info!(site = %store.site_url(), records = records.len(), "Scanning records");

        // Step 2: the scanned host decides which production host permalinks get
        let env_host = store.site_url().host_str().unwrap_or_default();
        let rewriter = hosts.rewriter(env_host);

        // Step 3: find the links
        let scan = self.scan_records(&records, store.site_url(), &rewriter).await;
        info!(site = %store.site_url(), posts = scan.posts, links = scan.rows.len(), "Site scanned");
        Ok(scan)
    }

    /// Number of records in a store with at least one target link
    pub async fn count_store(&mut self, store: &dyn ContentStore, options: &ScanOptions) -> Result<usize> {
        let records = store.query(&options.post_types, options.start_date).await?;

        let mut count = 0;
        for record in &records {
            let base = record.base_url(store.site_url());
            if self.has_target(&record.body, &base).await {
                count += 1;
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::{HeadResponse, LocationPolicy};
    use crate::config::{Config, RedirectorPattern};
    use crate::content::DumpStore;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    // aka.ms/pdf -> a PDF, aka.ms/page -> an HTML page, anything else: 404
    struct ShortLinks {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl HeaderProbe for ShortLinks {
        async fn head(&self, url: &str) -> std::result::Result<HeadResponse, reqwest::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let table: HashMap<&str, &str> = [
                ("https://aka.ms/pdf", "https://example.com/files/guide.pdf"),
                ("https://aka.ms/page", "https://example.com/guide"),
            ]
            .into_iter()
            .collect();

            Ok(match table.get(url) {
                Some(location) => HeadResponse {
                    status: StatusCode::FOUND,
                    locations: vec![location.to_string()],
                },
                None => HeadResponse {
                    status: StatusCode::NOT_FOUND,
                    locations: vec![],
                },
            })
        }
    }

    fn scanner() -> (Scanner<ShortLinks>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let classifier =
            Classifier::new("pdf", &[RedirectorPattern::Host("aka.ms".to_string())]).unwrap();
        let resolver = RedirectResolver::new(ShortLinks { calls: calls.clone() }, LocationPolicy::Last);
        (Scanner::new(classifier, resolver), calls)
    }

    fn record(id: u64, body: &str) -> ContentRecord {
        ContentRecord {
            id,
            body: body.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(9, 0, 0).unwrap(),
            title: format!("Post {id}"),
            permalink: format!("http://azure.test/post-{id}/"),
            post_type: "post".to_string(),
        }
    }

    fn site() -> Url {
        Url::parse("http://azure.test/").unwrap()
    }

    fn rewriter() -> PermalinkRewriter {
        ProductionHosts::from_config(&Config::default()).rewriter("azure.test")
    }

    #[test]
    fn test_parse_start_date() {
        assert_eq!(parse_start_date("03-01-2024").unwrap(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        for bad in ["13-40-2024", "2024-03-01", "3-1-2024", "02-30-2024", "", "03/01/2024"] {
            assert!(
                matches!(parse_start_date(bad), Err(PipelineError::InvalidDate { .. })),
                "{bad}"
            );
        }
    }

    #[tokio::test]
    async fn test_duplicate_anchor_yields_one_row() {
        let (mut scanner, _) = scanner();
        let body = r#"<a href="https://example.com/doc.pdf">x</a><a href="https://example.com/doc.pdf">x</a>"#;

        let scan = scanner.scan_records(&[record(1, body)], &site(), &rewriter()).await;
        assert_eq!(scan.rows.len(), 1);
        assert_eq!(scan.posts, 1);
        assert_eq!(scan.rows[0].pdf_url, "https://example.com/doc.pdf");
    }

    #[tokio::test]
    async fn test_three_repeats_one_row_and_record_listed_twice() {
        let (mut scanner, _) = scanner();
        let link = r#"<a href="https://example.com/a.pdf">a</a>"#;
        let body = link.repeat(3);

        let scan = scanner
            .scan_records(&[record(5, &body), record(5, &body)], &site(), &rewriter())
            .await;
        assert_eq!(scan.rows.len(), 1);
    }

    #[tokio::test]
    async fn test_one_row_per_distinct_link() {
        let (mut scanner, _) = scanner();
        let body = r#"
            <a href="https://example.com/a.pdf">a</a>
            <a href="https://example.com/page">page</a>
            <a href="https://example.com/b.PDF?v=2">b</a>
        "#;

        let scan = scanner.scan_records(&[record(2, body)], &site(), &rewriter()).await;
        let urls: Vec<_> = scan.rows.iter().map(|r| r.pdf_url.as_str()).collect();
        assert_eq!(urls, vec!["https://example.com/a.pdf", "https://example.com/b.PDF?v=2"]);
        assert_eq!(scan.rows[0].post_url, "http://azure.microsoft.com/post-2/");
        assert_eq!(scan.rows[0].post_title, "Post 2");
    }

    #[tokio::test]
    async fn test_relative_link_resolved_against_permalink() {
        let (mut scanner, _) = scanner();
        let body = r#"<a href="/files/doc.pdf">doc</a><a href="/about/">about</a>"#;

        let scan = scanner.scan_records(&[record(3, body)], &site(), &rewriter()).await;
        assert_eq!(scan.rows.len(), 1);
        assert_eq!(scan.rows[0].pdf_url, "http://azure.test/files/doc.pdf");
        assert_eq!(scan.rows[0].post_url, "http://azure.microsoft.com/post-3/");
    }

    #[tokio::test]
    async fn test_short_links_kept_only_when_they_land_on_pdf() {
        let (mut scanner, calls) = scanner();
        let body = r#"
            <a href="https://aka.ms/pdf">pdf</a>
            <a href="https://aka.ms/page">page</a>
            <a href="https://aka.ms/dead">dead</a>
        "#;

        let links = scanner.target_links(body, &site()).await;
        // The short link is exported, not its destination
        assert_eq!(links, vec!["https://aka.ms/pdf"]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        // Same links in another record: all answers come from the cache
        let again = scanner.target_links(body, &site()).await;
        assert_eq!(again, links);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(scanner.resolver().cache().len(), 3);
    }

    #[tokio::test]
    async fn test_has_target_stops_early() {
        let (mut scanner, calls) = scanner();
        let body = r#"
            <a href="https://example.com/a.pdf">a</a>
            <a href="https://aka.ms/pdf">short</a>
        "#;

        assert!(scanner.has_target(body, &site()).await);
        // The short link after the first match was never looked up
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!scanner
            .has_target(r#"<a href="https://example.com/">home</a>"#, &site())
            .await);
    }

    #[tokio::test]
    async fn test_scan_store_filters_and_rewrites() {
        let store = DumpStore::new(
            "http://opensource.test",
            vec![
                record(1, r#"<a href="https://example.com/a.pdf">a</a>"#),
                record(2, r#"<a href="https://example.com/">none</a>"#),
            ],
        )
        .unwrap();
        let options = ScanOptions {
            post_types: vec!["post".to_string()],
            start_date: None,
        };
        let hosts = ProductionHosts::from_config(&Config::default());

        let (mut scanner, _) = scanner();
        let scan = scanner.scan_store(&store, &options, &hosts).await.unwrap();
        assert_eq!(scan.rows.len(), 1);
        assert_eq!(scan.posts, 1);
        // The record permalinks point at azure.test, not the scanned host
        assert_eq!(scan.rows[0].post_url, "http://azure.test/post-1/");

        assert_eq!(scanner.count_store(&store, &options).await.unwrap(), 1);

        let later = ScanOptions {
            start_date: NaiveDate::from_ymd_opt(2024, 1, 2),
            ..options
        };
        assert!(scanner.scan_store(&store, &later, &hosts).await.unwrap().rows.is_empty());
    }
}
