// src/content/wordpress.rs
// =============================================================================
// This module reads records from a WordPress site through its REST API.
//
// Strategy:
// - Each post type maps to a collection: post -> /wp-json/wp/v2/posts,
//   page -> /wp-json/wp/v2/pages, anything else is used as-is (custom types
//   register their own rest_base, usually the type name)
// - Collections are paged (100 per page) until X-WP-TotalPages is reached
// - Only published records (status=publish) and only the fields we need
//   (_fields=...) are requested
//
// Dates: WordPress' `after` filter is exclusive, ours is inclusive, so we ask
// for one second before midnight and re-check every record locally.
//
// Why not the CLI / database directly?
// - The REST API works from anywhere, no shell access to the server needed
// - Public, published content needs no authentication
// =============================================================================

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use reqwest::{Client, StatusCode};
use scraper::Html;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::{ContentRecord, ContentStore};
use crate::error::{PipelineError, Result};

const PER_PAGE: u32 = 100;

// Shape of one item in a /wp/v2 collection (only the fields we request)
#[derive(Debug, Deserialize)]
struct WpPost {
    id: u64,
    date: NaiveDateTime,
    link: String,
    #[serde(rename = "type")]
    post_type: String,
    title: Rendered,
    content: Rendered,
}

#[derive(Debug, Deserialize)]
struct Rendered {
    rendered: String,
}

impl From<WpPost> for ContentRecord {
    fn from(post: WpPost) -> Self {
        ContentRecord {
            id: post.id,
            body: post.content.rendered,
            date: post.date,
            title: decode_text(&post.title.rendered),
            permalink: post.link,
            post_type: post.post_type,
        }
    }
}

pub struct WordPressStore {
    client: Client,
    site_url: Url,
}

impl WordPressStore {
    pub fn new(site_url: &str, timeout: Duration) -> Result<Self> {
        let mut site_url = Url::parse(site_url)
            .map_err(|e| PipelineError::Store(format!("invalid site URL '{site_url}': {e}")))?;

        // Url::join replaces the last segment unless the path ends in '/'
        if !site_url.path().ends_with('/') {
            let path = format!("{}/", site_url.path());
            site_url.set_path(&path);
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(WordPressStore { client, site_url })
    }

    // e.g. collection_url("posts") -> http://site/wp-json/wp/v2/posts
    fn collection_url(&self, rest_base: &str) -> Result<Url> {
        self.site_url
            .join(&format!("wp-json/wp/v2/{rest_base}"))
            .map_err(|e| PipelineError::Store(format!("bad REST path for '{rest_base}': {e}")))
    }

    async fn fetch_collection(
        &self,
        post_type: &str,
        after: Option<NaiveDate>,
    ) -> Result<Vec<ContentRecord>> {
        let mut url = self.collection_url(rest_base(post_type))?;
        url.query_pairs_mut()
            .append_pair("per_page", &PER_PAGE.to_string())
            .append_pair("status", "publish")
            .append_pair("_fields", "id,date,link,type,title,content");
        if let Some(after) = after.and_then(exclusive_after) {
            url.query_pairs_mut().append_pair("after", &after);
        }

        let mut records = Vec::new();
        let mut page = 1u32;

        loop {
            let mut page_url = url.clone();
            page_url.query_pairs_mut().append_pair("page", &page.to_string());
            debug!(url = %page_url, "Fetching page");

            let response = self.client.get(page_url.clone()).send().await?;
            if !response.status().is_success() {
                return Err(PipelineError::Store(format!(
                    "GET {page_url}: HTTP {}",
                    response.status()
                )));
            }

            let total_pages = response
                .headers()
                .get("x-wp-totalpages")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u32>().ok());

            let posts: Vec<WpPost> = response.json().await?;
            let count = posts.len();
            records.extend(posts.into_iter().map(ContentRecord::from));

            let done = match total_pages {
                Some(total) => page >= total,
                None => count < PER_PAGE as usize,
            };
            if done {
                break;
            }
            page += 1;
        }

        // `after` was shifted by a second; enforce the inclusive bound here
        records.retain(|r| r.published_since(after));
        info!(post_type, count = records.len(), "Fetched records");
        Ok(records)
    }
}

#[async_trait]
impl ContentStore for WordPressStore {
    fn site_url(&self) -> &Url {
        &self.site_url
    }

    async fn query(
        &self,
        post_types: &[String],
        after: Option<NaiveDate>,
    ) -> Result<Vec<ContentRecord>> {
        let mut records = Vec::new();
        for post_type in post_types {
            records.extend(self.fetch_collection(post_type, after).await?);
        }
        Ok(records)
    }

    async fn record(&self, id: u64, post_types: &[String]) -> Result<Option<ContentRecord>> {
        for post_type in post_types {
            let url = self.collection_url(&format!("{}/{id}", rest_base(post_type)))?;
            let response = self.client.get(url.clone()).send().await?;

            // Wrong collection for this id; try the next type
            if response.status() == StatusCode::NOT_FOUND {
                continue;
            }
            if !response.status().is_success() {
                return Err(PipelineError::Store(format!("GET {url}: HTTP {}", response.status())));
            }

            let post: WpPost = response.json().await?;
            return Ok(Some(post.into()));
        }
        Ok(None)
    }
}

// Built-in types use plural collection names
fn rest_base(post_type: &str) -> &str {
    match post_type {
        "post" => "posts",
        "page" => "pages",
        other => other,
    }
}

// One second before midnight of `start`, in the format WordPress expects
fn exclusive_after(start: NaiveDate) -> Option<String> {
    let midnight = start.and_hms_opt(0, 0, 0)?;
    let before = midnight - chrono::Duration::seconds(1);
    Some(before.format("%Y-%m-%dT%H:%M:%S").to_string())
}

// Rendered titles contain entities (&#8217;) and sometimes tags
fn decode_text(html: &str) -> String {
    Html::parse_fragment(html)
        .root_element()
        .text()
        .collect::<String>()
        .trim()
        .to_string()
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why `impl From<WpPost> for ContentRecord`?
//    - It keeps the REST wire shape (title.rendered, type, link) out of the
//      rest of the program
//    - `.map(ContentRecord::from)` and `post.into()` both use it
//
// 2. Why page until X-WP-TotalPages?
//    - WordPress answers 400 for a page past the end, so we must not overshoot
//    - If a proxy strips the header, a short page also means "last page"
// -----------------------------------------------------------------------------
