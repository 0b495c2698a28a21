// src/scan/permalink.rs
// =============================================================================
// Rewrites permalinks from the scanning environment to production.
//
// Scans usually run against a local or staging copy (azure.test), but the
// exported sheet should point at the live page (azure.microsoft.com). The
// mapping is a plain lookup table from config, with a fallback host for
// environments the table doesn't know.
// =============================================================================

use std::collections::BTreeMap;
use url::Url;

use crate::config::Config;

#[derive(Debug, Clone)]
pub struct ProductionHosts {
    table: BTreeMap<String, String>,
    default: String,
}

impl ProductionHosts {
    pub fn new(table: BTreeMap<String, String>, default: impl Into<String>) -> Self {
        ProductionHosts {
            table,
            default: default.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        ProductionHosts::new(
            config.production_hosts.clone(),
            config.default_production_host.clone(),
        )
    }

    /// Exact match on the environment host, default otherwise
    pub fn production_host(&self, env_host: &str) -> &str {
        self.table.get(env_host).map(String::as_str).unwrap_or(&self.default)
    }

    pub fn rewriter(&self, env_host: &str) -> PermalinkRewriter {
        PermalinkRewriter {
            env_host: env_host.to_string(),
            prod_host: self.production_host(env_host).to_string(),
        }
    }
}

/// Rewriter bound to one scanned site
#[derive(Debug, Clone)]
pub struct PermalinkRewriter {
    env_host: String,
    prod_host: String,
}

impl PermalinkRewriter {
    /// Swaps the environment host for the production host. Links on other
    /// hosts (or that don't parse) are returned unchanged.
    pub fn rewrite(&self, permalink: &str) -> String {
        let mut url = match Url::parse(permalink) {
            Ok(url) => url,
            Err(_) => return permalink.to_string(),
        };

        if url.host_str() != Some(self.env_host.as_str()) {
            return permalink.to_string();
        }

        match url.set_host(Some(&self.prod_host)) {
            Ok(()) => url.to_string(),
            Err(_) => permalink.to_string(),
        }
    }
}
