//! Sitesurge: a sitemap-driven load tester and page archiver
//!
//! This crate resolves a target set of URLs from a sitemap tree or a flat list,
//! partitions it across a fixed pool of workers, and drives requests against it
//! while collecting throughput and failure metrics. The archive mode reuses the
//! same machinery to save page HTML and, optionally, spider newly found links
//! until no new URLs remain.

pub mod config;
pub mod crawler;
pub mod output;
pub mod url;

use thiserror::Error;

/// Main error type for Sitesurge operations
#[derive(Debug, Error)]
pub enum SurgeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),
}

/// Configuration-specific errors
///
/// Every variant is fatal to a job and is raised before any worker starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid header '{0}', expected 'Key: Value'")]
    InvalidHeader(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),

    #[error("No URLs found at {0}")]
    NoUrls(String),
}

/// URL-specific errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("Empty URL")]
    Empty,

    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Sitesurge operations
pub type Result<T> = std::result::Result<T, SurgeError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{block_range, JobMetrics, ThreadMetrics, WorkBlock};
pub use url::{normalize_uri, NormalizedUri, UriNormalizer};
