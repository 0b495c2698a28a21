// src/error.rs
// =============================================================================
// Typed errors for the scan / export / merge pipeline.
//
// The CLI layer (main.rs) wraps these in anyhow::Error with extra context,
// but the pipeline modules return PipelineError so callers (and tests) can
// tell an invalid date from an unwritable file.
//
// Network failures while resolving redirects never show up here: the
// resolver treats them as "no redirect found" and carries on.
// =============================================================================

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The --start-date argument is not a real MM-DD-YYYY date
    #[error("Invalid date '{input}': expected MM-DD-YYYY")]
    InvalidDate { input: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid redirector pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed report {}: {source}", path.display())]
    MalformedReport {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The content store answered, but not with something we understand
    #[error("Content store error: {0}")]
    Store(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl PipelineError {
    /// Helper so call sites can write `.map_err(|e| PipelineError::io(path, e))`
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
