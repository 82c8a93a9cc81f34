//! Crawler coordinator - main crawl orchestration logic
//!
//! This module drives the `category x fiscal year x page` traversal:
//! - Building page URLs for each position
//! - Fetching and extracting pages in strict sequence
//! - Applying courtesy delays between pages, fiscal years and categories
//! - Aggregating records and counters into a [`CrawlReport`]
//! - Stopping cleanly when cancelled

use crate::config::{validate, Config};
use crate::crawler::accumulator::{Accumulator, CrawlReport};
use crate::crawler::fetcher::{build_http_client, fetch_page_with_retry, FetchResult};
use crate::crawler::pacer::{CancelToken, DelayKind, Pacer};
use crate::crawler::parser::extract_page;
use crate::record::{CaseRecord, Category, FiscalYearFilter};
use crate::url::build_page_url;
use crate::CrawlError;
use reqwest::Client;
use url::Url;

/// Records and report of one crawl run
#[derive(Debug)]
pub struct CrawlOutcome {
    pub records: Vec<CaseRecord>,
    pub report: CrawlReport,
}

/// Whether the traversal may go on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Cancelled,
}

/// Main crawler coordinator structure
///
/// One coordinator runs one crawl; all accumulated state lives in the
/// [`Accumulator`] created by [`Coordinator::run`].
pub struct Coordinator {
    config: Config,
    client: Client,
    base_url: Url,
    pacer: Pacer,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration, validated here
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(CrawlError)` - The configuration is invalid, or the HTTP client
    ///   or base URL could not be built
    pub fn new(config: Config) -> Result<Self, CrawlError> {
        Self::with_cancel_token(config, CancelToken::new())
    }

    /// Creates a coordinator that stops when `cancel` is triggered
    pub fn with_cancel_token(config: Config, cancel: CancelToken) -> Result<Self, CrawlError> {
        validate(&config)?;

        let client = build_http_client(&config.source)?;
        let base_url = Url::parse(&config.source.base_url)?;
        let pacer = Pacer::new(&config.crawl, cancel);

        Ok(Self {
            config,
            client,
            base_url,
            pacer,
        })
    }

    /// Replaces the pacer, e.g. to share a request budget between coordinators
    pub fn with_pacer(mut self, pacer: Pacer) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.pacer.cancel_token().clone()
    }

    /// Returns the traversal plan in crawl order
    pub fn plan(&self) -> Vec<(Category, FiscalYearFilter)> {
        let years = self.config.fiscal_year_plan();
        self.config
            .categories()
            .into_iter()
            .flat_map(|category| years.iter().cloned().map(move |fy| (category, fy)))
            .collect()
    }

    /// Runs the crawl to completion or cancellation
    ///
    /// Never fails: fetch errors end pagination for their pair and row
    /// errors are skipped, both counted in the report.
    pub async fn run(&mut self) -> CrawlOutcome {
        let categories = self.config.categories();
        let years = self.config.fiscal_year_plan();
        let mut acc = Accumulator::new();
        let mut flow = Flow::Continue;

        tracing::info!(
            "Starting crawl: {} categories x {} fiscal years, up to {} pages each",
            categories.len(),
            years.len(),
            self.config.crawl.max_pages
        );

        'categories: for (ci, category) in categories.iter().enumerate() {
            if ci > 0 && !self.pacer.pause(DelayKind::Category).await {
                flow = Flow::Cancelled;
                break;
            }

            tracing::info!("Category {}", category);
            let before = acc.len();

            for (fi, fiscal_year) in years.iter().enumerate() {
                if fi > 0 && !self.pacer.pause(DelayKind::FiscalYear).await {
                    flow = Flow::Cancelled;
                    break 'categories;
                }

                acc.begin_pair(*category, fiscal_year);
                flow = self.crawl_pair(*category, fiscal_year, &mut acc).await;
                if flow == Flow::Cancelled {
                    break 'categories;
                }
            }

            tracing::info!(
                "Category {} complete: {} records",
                category,
                acc.len() - before
            );
        }

        let cancelled = flow == Flow::Cancelled || self.pacer.cancel_token().is_cancelled();
        if cancelled {
            tracing::warn!("Crawl cancelled, keeping {} records collected so far", acc.len());
        }

        let (records, report) = acc.finish(self.pacer.counts(), cancelled);

        tracing::info!(
            "Crawl finished: {} records from {} pages ({} failed fetches, {} row errors)",
            report.total_records,
            report.pages_fetched,
            report.failed_fetches,
            report.row_errors
        );

        CrawlOutcome { records, report }
    }

    /// Paginates one (category, fiscal year) pair
    ///
    /// Advances only while the page reported a next-page control and yielded
    /// at least one record, up to the page ceiling.
    async fn crawl_pair(
        &mut self,
        category: Category,
        fiscal_year: &FiscalYearFilter,
        acc: &mut Accumulator,
    ) -> Flow {
        let max_pages = self.config.crawl.max_pages;
        let retries = self.config.source.transport_retries;
        let backoff = self.config.source.retry_backoff();
        let cancel = self.pacer.cancel_token().clone();
        let mut page = 1;
        let mut pair_records = 0;

        loop {
            let url = match build_page_url(&self.base_url, category, fiscal_year, page) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!("Cannot build URL for {} page {}: {}", category, page, e);
                    acc.record_failed_fetch();
                    break;
                }
            };

            let Some(permit) = self.pacer.acquire().await else {
                return Flow::Cancelled;
            };

            let result = tokio::select! {
                result = fetch_page_with_retry(&self.client, &url, retries, backoff) => result,
                _ = cancel.cancelled() => return Flow::Cancelled,
            };
            drop(permit);

            let has_next_page = match result {
                FetchResult::Success {
                    final_url,
                    body,
                    has_next_page,
                    ..
                } => {
                    if final_url != url {
                        tracing::debug!("{} redirected to {}", url, final_url);
                    }

                    // Parse synchronously; the document never crosses an await
                    let extracted = extract_page(&body, &final_url, category, fiscal_year, page);
                    let found = acc.record_page(extracted);
                    pair_records += found;

                    tracing::info!(
                        "{} [{}] page {}: {} records",
                        category,
                        fiscal_year.label(),
                        page,
                        found
                    );

                    has_next_page && found > 0
                }
                FetchResult::Failed { error, attempts } => {
                    tracing::warn!(
                        "{} [{}] page {} failed after {} attempt(s): {}",
                        category,
                        fiscal_year.label(),
                        page,
                        attempts,
                        error
                    );
                    acc.record_failed_fetch();
                    false
                }
            };

            if !has_next_page {
                break;
            }

            if page >= max_pages {
                tracing::info!(
                    "{} [{}] reached page ceiling {}",
                    category,
                    fiscal_year.label(),
                    max_pages
                );
                break;
            }

            if !self.pacer.pause(DelayKind::Page).await {
                return Flow::Cancelled;
            }
            page += 1;
        }

        tracing::debug!(
            "{} [{}] done: {} records over {} page(s)",
            category,
            fiscal_year.label(),
            pair_records,
            page
        );

        Flow::Continue
    }
}

/// Runs a complete crawl with the given configuration
///
/// # Example
///
/// ```no_run
/// use ciaa_crawler::config::load_config;
/// use ciaa_crawler::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("crawler.toml"))?;
/// let outcome = run_crawl(config).await?;
/// println!("{} records", outcome.records.len());
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config) -> Result<CrawlOutcome, CrawlError> {
    let mut coordinator = Coordinator::new(config)?;
    Ok(coordinator.run().await)
}
