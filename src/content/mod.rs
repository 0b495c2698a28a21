// src/content/mod.rs
// =============================================================================
// This module is the boundary to the content-management system.
//
// The scanner only needs two things from a CMS:
// - "give me every published record of these post types (since a date)"
// - "give me this one record"
//
// ContentStore captures exactly that. Two stores exist:
// - dump: reads a JSON export of the site (offline runs, tests)
// - wordpress: talks to the WordPress REST API
//
// Rust concepts:
// - async_trait: async methods on a trait we use as Box<dyn ContentStore>
// - chrono::NaiveDateTime: CMS dates have no time zone attached
// =============================================================================

mod dump;
mod wordpress;

pub use dump::DumpStore;
pub use wordpress::WordPressStore;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Result;

/// One unit of content (a post, a page, ...). Read-only for this tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: u64,
    /// Raw HTML body
    pub body: String,
    /// Publish date as stored by the CMS
    pub date: NaiveDateTime,
    pub title: String,
    /// Canonical URL of the record on the scanned site
    pub permalink: String,
    #[serde(default = "default_post_type")]
    pub post_type: String,
}

fn default_post_type() -> String {
    "post".to_string()
}

impl ContentRecord {
    /// True when the record was published on or after `start` (inclusive)
    pub fn published_since(&self, start: Option<NaiveDate>) -> bool {
        start.map_or(true, |start| self.date.date() >= start)
    }

    /// URL that relative links in the body are resolved against: the
    /// permalink, or the site itself when the permalink doesn't parse
    pub fn base_url(&self, site_url: &Url) -> Url {
        Url::parse(&self.permalink).unwrap_or_else(|_| site_url.clone())
    }
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Base URL of the site this store reads from
    fn site_url(&self) -> &Url;

    /// All published records of the given post types, optionally only those
    /// published on or after `after`
    async fn query(
        &self,
        post_types: &[String],
        after: Option<NaiveDate>,
    ) -> Result<Vec<ContentRecord>>;

    /// One record by id, searched across the given post types
    async fn record(&self, id: u64, post_types: &[String]) -> Result<Option<ContentRecord>>;
}
