// src/config.rs
// =============================================================================
// Runtime configuration, loaded from an optional TOML file.
//
// Everything that differs between deployments lives here instead of in code:
// - which URLs count as short links / redirectors
// - the "local host -> production host" table used to rewrite permalinks
// - the CSV delimiter
// - the list of sites to scan
//
// Without --config the built-in defaults are used, which match the sites
// this tool was first written for.
//
// Example file:
//
//   default_production_host = "www.example.com"
//   short_link_hosts = ["aka.ms"]
//   redirectors = [{ host = "aka.ms" }, { regex = "/download/\\d+$" }]
//
//   [production_hosts]
//   "docs.test" = "docs.example.com"
//
//   [[sites]]
//   url = "http://docs.test"
//
// Rust concepts:
// - serde(default): missing keys fall back to the Default impl
// - Externally tagged enums: `{ host = "aka.ms" }` becomes RedirectorPattern::Host
// =============================================================================

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::checker::LocationPolicy;
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// File extension that marks a target document (without the dot)
    pub target_extension: String,

    /// URLs matching any of these may redirect to a target document
    pub redirectors: Vec<RedirectorPattern>,

    /// Hosts whose URLs carry no file name, so reports are named
    /// "<last segment>.pdf" instead
    pub short_link_hosts: Vec<String>,

    pub default_production_host: String,

    /// Exact-match table: scanning environment host -> production host
    pub production_hosts: BTreeMap<String, String>,

    pub csv: CsvConfig,
    pub redirects: RedirectConfig,
    pub reports: ReportConfig,
    pub sites: Vec<SiteConfig>,
}

/// One redirector rule. In TOML: `{ host = ".." }`, `{ contains = ".." }`
/// or `{ regex = ".." }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedirectorPattern {
    /// URL host equals this value
    Host(String),
    /// URL contains this substring anywhere
    Contains(String),
    /// URL matches this regular expression
    Regex(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CsvConfig {
    pub delimiter: char,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedirectConfig {
    pub timeout_secs: u64,
    pub multiple_locations: LocationPolicy,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Abort the merge on an unparsable report instead of skipping it
    pub strict: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SiteConfig {
    /// Base URL of the site, e.g. "http://docs.test"
    pub url: String,

    /// Archived sites are skipped
    #[serde(default)]
    pub archived: bool,

    /// Read records from a JSON dump instead of the REST API
    #[serde(default)]
    pub dump: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let production_hosts = [
            ("azure.test", "azure.microsoft.com"),
            ("opensource.test", "opensource.microsoft.com"),
            ("quantum.test", "azure.microsoft.com"),
        ]
        .into_iter()
        .map(|(local, prod)| (local.to_string(), prod.to_string()))
        .collect();

        Config {
            target_extension: "pdf".to_string(),
            redirectors: vec![RedirectorPattern::Host("aka.ms".to_string())],
            short_link_hosts: vec!["aka.ms".to_string()],
            default_production_host: "www.microsoft.com".to_string(),
            production_hosts,
            csv: CsvConfig::default(),
            redirects: RedirectConfig::default(),
            reports: ReportConfig::default(),
            sites: Vec::new(),
        }
    }
}

impl Default for CsvConfig {
    fn default() -> Self {
        CsvConfig { delimiter: ',' }
    }
}

impl Default for RedirectConfig {
    fn default() -> Self {
        RedirectConfig {
            timeout_secs: 10,
            multiple_locations: LocationPolicy::Last,
        }
    }
}

impl CsvConfig {
    /// The csv crate wants a single byte
    pub fn delimiter_byte(&self) -> Result<u8> {
        if self.delimiter.is_ascii() && self.delimiter != '"' && self.delimiter != '\n' {
            Ok(self.delimiter as u8)
        } else {
            Err(PipelineError::InvalidConfig(format!(
                "CSV delimiter {:?} must be a single ASCII character other than quote or newline",
                self.delimiter
            )))
        }
    }
}

impl Config {
    /// Loads the config file, or the defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| PipelineError::io(path, e))?;
                Config::from_toml(&text)?
            }
            None => Config::default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Config> {
        toml::from_str(text).map_err(|e| PipelineError::InvalidConfig(e.to_string()))
    }

    // Catch bad values at startup instead of halfway through a scan
    fn validate(&self) -> Result<()> {
        self.csv.delimiter_byte()?;

        let extension = self.target_extension.trim_start_matches('.');
        if extension.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "target_extension must not be empty".to_string(),
            ));
        }

        for pattern in &self.redirectors {
            if let RedirectorPattern::Regex(source) = pattern {
                regex::Regex::new(source)?;
            }
        }

        Ok(())
    }
}
