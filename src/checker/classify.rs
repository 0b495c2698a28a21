// src/checker/classify.rs
// =============================================================================
// Decides, from the URL string alone, whether a link points at a target
// document (a PDF by default).
//
// Three possible answers:
// - DirectMatch: the path ends in ".pdf", or a query value does
//   (e.g. /viewer?file=report.pdf)
// - PotentialRedirect: the URL matches a configured redirector pattern
//   (short-link hosts like aka.ms); we can only know after a HEAD request
// - NotATarget: anything else
//
// Redirector patterns are checked first, so "https://aka.ms/report.pdf" is a
// PotentialRedirect, never a DirectMatch.
//
// Rust concepts:
// - Enums without data: a closed set of outcomes the compiler checks
// - Byte slices: case-insensitive suffix checks without allocating
// =============================================================================

use regex::Regex;
use url::Url;

use crate::config::{Config, RedirectorPattern};
use crate::error::Result;

/// The outcome of classifying one URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    DirectMatch,
    PotentialRedirect,
    NotATarget,
}

// A redirector pattern, compiled once
#[derive(Debug)]
enum Matcher {
    Host(String),
    Contains(String),
    Regex(Regex),
}

impl Matcher {
    fn matches(&self, raw: &str, parsed: Option<&Url>) -> bool {
        match self {
            Matcher::Host(host) => parsed
                .and_then(|url| url.host_str())
                .map(|h| h.eq_ignore_ascii_case(host))
                .unwrap_or(false),
            Matcher::Contains(needle) => raw.contains(needle.as_str()),
            Matcher::Regex(re) => re.is_match(raw),
        }
    }
}

#[derive(Debug)]
pub struct Classifier {
    // Always stored as ".pdf" style, lowercase
    suffix: String,
    matchers: Vec<Matcher>,
}

impl Classifier {
    pub fn new(extension: &str, patterns: &[RedirectorPattern]) -> Result<Self> {
        let suffix = format!(".{}", extension.trim_start_matches('.').to_ascii_lowercase());

        let mut matchers = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            matchers.push(match pattern {
                RedirectorPattern::Host(host) => Matcher::Host(host.clone()),
                RedirectorPattern::Contains(needle) => Matcher::Contains(needle.clone()),
                RedirectorPattern::Regex(source) => Matcher::Regex(Regex::new(source)?),
            });
        }

        Ok(Classifier { suffix, matchers })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Classifier::new(&config.target_extension, &config.redirectors)
    }

    /// Classifies a URL. Pure: no network, no state.
    pub fn classify(&self, url: &str) -> Classification {
        let parsed = Url::parse(url).ok();

        if self.matchers.iter().any(|m| m.matches(url, parsed.as_ref())) {
            Classification::PotentialRedirect
        } else if self.is_target_shape(url, parsed.as_ref()) {
            Classification::DirectMatch
        } else {
            Classification::NotATarget
        }
    }

    // Path (without query string) or any query value ends in the suffix
    fn is_target_shape(&self, raw: &str, parsed: Option<&Url>) -> bool {
        match parsed {
            Some(url) => {
                ends_with_ignore_case(url.path(), &self.suffix)
                    || url
                        .query_pairs()
                        .any(|(_, value)| ends_with_ignore_case(&value, &self.suffix))
            }
            None => {
                // Not a valid URL; still look at everything before '?' or '#'
                let path = raw.split(['?', '#']).next().unwrap_or(raw);
                ends_with_ignore_case(path.trim(), &self.suffix)
            }
        }
    }
}

fn ends_with_ignore_case(text: &str, suffix: &str) -> bool {
    let text = text.as_bytes();
    let suffix = suffix.as_bytes();
    text.len() >= suffix.len() && text[text.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}
