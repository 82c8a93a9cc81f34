//! Crawler module for listing-page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with optional transport retries
//! - Listing-table record extraction
//! - Courtesy pacing and cancellation
//! - Overall crawl coordination

mod accumulator;
mod coordinator;
mod fetcher;
mod pacer;
mod parser;

pub use accumulator::{Accumulator, CrawlReport, PairReport};
pub use coordinator::{run_crawl, Coordinator, CrawlOutcome};
pub use fetcher::{build_http_client, fetch_page, fetch_page_with_retry, FetchError, FetchResult};
pub use pacer::{CancelToken, DelayCounts, DelayKind, Pacer};
pub use parser::{extract_page, has_next_page, ExtractedPage, RowError, FULL_ROW_CELLS, MIN_CELLS};
