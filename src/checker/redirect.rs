// src/checker/redirect.rs
// =============================================================================
// This module resolves short links (aka.ms/...) to where they point.
//
// Key functionality:
// - Makes one HTTP HEAD request per URL, without following redirects
// - Reads the Location header from a 3xx answer
// - Remembers every answer (including "no redirect") for the rest of the run
// - Never fails: network errors mean "no redirect found"
//
// The HTTP part sits behind the HeaderProbe trait so the resolver can be
// tested without a network, and so a run owns exactly one cache.
//
// Rust concepts:
// - Traits: HeaderProbe abstracts "ask a server for headers"
// - Generics: RedirectResolver<P> works with any probe
// - HashMap: the per-run cache
// =============================================================================

use async_trait::async_trait;
use reqwest::header::LOCATION;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::Result;

/// What to do when a response carries more than one Location header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationPolicy {
    /// The last syntactically valid absolute URL wins
    #[default]
    Last,
    /// Ambiguous responses count as "no redirect"
    Reject,
}

/// The parts of an HTTP response the resolver cares about
#[derive(Debug, Clone)]
pub struct HeadResponse {
    pub status: StatusCode,
    /// Every Location header value, in the order the server sent them
    pub locations: Vec<String>,
}

/// Something that can fetch response headers for a URL
#[async_trait]
pub trait HeaderProbe: Send + Sync {
    async fn head(&self, url: &str) -> std::result::Result<HeadResponse, reqwest::Error>;
}

/// The real probe, backed by reqwest
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Result<Self> {
        // Redirects are NOT followed: we want to see the first Location
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(HttpProbe { client })
    }
}

#[async_trait]
impl HeaderProbe for HttpProbe {
    async fn head(&self, url: &str) -> std::result::Result<HeadResponse, reqwest::Error> {
        let mut response = self.client.head(url).send().await?;

        // Some servers refuse HEAD; a GET gives us the same headers
        // (we never read the body)
        if response.status() == StatusCode::METHOD_NOT_ALLOWED {
            response = self.client.get(url).send().await?;
        }

        // get_all: a server may (wrongly) send several Location headers
        let locations = response
            .headers()
            .get_all(LOCATION)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(str::to_string)
            .collect();

        Ok(HeadResponse {
            status: response.status(),
            locations,
        })
    }
}

/// Source URL -> resolved destination, for one run.
///
/// `None` values are cached too: a failed lookup is final for the run.
#[derive(Debug, Default)]
pub struct RedirectCache {
    entries: HashMap<String, Option<String>>,
}

impl RedirectCache {
    pub fn get(&self, url: &str) -> Option<&Option<String>> {
        self.entries.get(url)
    }

    pub fn insert(&mut self, url: String, destination: Option<String>) {
        self.entries.insert(url, destination);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct RedirectResolver<P> {
    probe: P,
    cache: RedirectCache,
    policy: LocationPolicy,
}

impl<P: HeaderProbe> RedirectResolver<P> {
    pub fn new(probe: P, policy: LocationPolicy) -> Self {
        RedirectResolver {
            probe,
            cache: RedirectCache::default(),
            policy,
        }
    }

    /// Resolves one redirect step. Returns None when the URL does not
    /// redirect or the lookup failed.
    pub async fn resolve(&mut self, url: &str) -> Option<String> {
        // Cache hit: no network, whatever the earlier answer was
        if let Some(cached) = self.cache.get(url) {
            match cached {
                Some(destination) => {
                    info!(%url, %destination, "Found cached redirection");
                }
                None => debug!(%url, "Cached: no redirection"),
            }
            return cached.clone();
        }

        // Cache miss: one request, never followed further
        info!(%url, "Checking short link");
        let destination = match self.probe.head(url).await {
            Ok(response) => pick_destination(url, &response, self.policy),
            Err(e) => {
                warn!(%url, error = %e, "Redirect lookup failed");
                None
            }
        };

        if let Some(destination) = &destination {
            info!(%url, %destination, "Found redirection");
        }

        // Stored before returning, so the next record asking skips the request
        self.cache.insert(url.to_string(), destination.clone());
        destination
    }

    pub fn cache(&self) -> &RedirectCache {
        &self.cache
    }
}

// Picks the destination out of a response, honouring the policy
fn pick_destination(url: &str, response: &HeadResponse, policy: LocationPolicy) -> Option<String> {
    if !response.status.is_redirection() {
        debug!(%url, status = response.status.as_u16(), "Not a redirect");
        return None;
    }

    // Relative or garbled Location values can't be classified
    let mut valid = response
        .locations
        .iter()
        .filter(|location| Url::parse(location).is_ok());

    match policy {
        LocationPolicy::Last => valid.last().cloned(),
        LocationPolicy::Reject => {
            if response.locations.len() > 1 {
                warn!(%url, count = response.locations.len(), "Multiple Location headers, ignoring");
                None
            } else {
                valid.next().cloned()
            }
        }
    }
}
