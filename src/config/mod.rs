//! Configuration module for the crawler
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use ciaa_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawler.toml")).unwrap();
//! println!("Crawler will fetch at most {} pages per year", config.crawl.max_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlConfig, OutputConfig, SourceConfig};

// Re-export parser functions
pub use parser::{
    compute_config_hash, effective_config_hash, load_config, load_config_with_hash, parse_config,
};
pub use validation::validate;
