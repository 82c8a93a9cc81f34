//! CIAA case crawler: a polite historical crawler for public case listings
//!
//! This crate walks the `category x fiscal-year x page` listing space of the
//! CIAA press-release site, extracts structured case records from the listing
//! tables, normalizes native-script numerals and dates, and persists the
//! deduplicated result set atomically.

pub mod config;
pub mod crawler;
pub mod normalize;
pub mod output;
pub mod record;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for crawler operations
///
/// Only setup failures surface here; sinks report through `OutputError`.
/// Transport failures and row-level parse failures are absorbed by the
/// fetcher and the extractor.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Unknown category key: {0}")]
    UnknownCategory(String),

    #[error("Output target not writable: {0}")]
    UnwritableOutput(String),
}

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CancelToken, Coordinator, CrawlReport};
pub use normalize::{extract_amounts, normalize_amount, normalize_date, CaseDate};
pub use record::{CaseRecord, Category, FiscalYear, FiscalYearFilter};
