use crate::record::{default_fiscal_years, Category, FiscalYear, FiscalYearFilter};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure for the crawler
///
/// Every section is optional; a missing section takes the defaults the
/// historical crawl was tuned with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub crawl: CrawlConfig,

    #[serde(default = "default_fiscal_years", rename = "fiscal-years")]
    pub fiscal_years: Vec<FiscalYear>,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Where and how pages are fetched
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SourceConfig {
    /// Site root; category paths are joined onto it
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Static user agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Hard per-request timeout (milliseconds)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Extra attempts after a transport failure (timeouts, connect errors, 5xx)
    #[serde(default)]
    pub transport_retries: u32,

    /// Backoff unit between retry attempts (milliseconds), multiplied by attempt
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

/// Traversal shape and courtesy delays
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlConfig {
    /// Category keys to crawl, in order
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,

    /// Iterate the fiscal-year list, or do a single "current" pass
    #[serde(default = "default_true")]
    pub use_fiscal_years: bool,

    /// Page ceiling per (category, fiscal year)
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Delay between page requests (milliseconds)
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    /// Delay between fiscal-year iterations (milliseconds)
    #[serde(default = "default_fiscal_year_delay_ms")]
    pub fiscal_year_delay_ms: u64,

    /// Delay between category iterations (milliseconds)
    #[serde(default = "default_category_delay_ms")]
    pub category_delay_ms: u64,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path of the JSON record file
    #[serde(default = "default_json_path")]
    pub json_path: String,

    /// Optional SQLite store to upsert records into
    #[serde(default)]
    pub database_path: Option<String>,

    /// Optional markdown run summary
    #[serde(default)]
    pub summary_path: Option<String>,
}

impl Config {
    /// Returns the configured categories
    ///
    /// Unknown keys are skipped here; `validate` rejects them at load time.
    pub fn categories(&self) -> Vec<Category> {
        self.crawl
            .categories
            .iter()
            .filter_map(|key| Category::from_key(key))
            .collect()
    }

    /// Returns the fiscal-year axis of the traversal
    pub fn fiscal_year_plan(&self) -> Vec<FiscalYearFilter> {
        FiscalYearFilter::plan(self.crawl.use_fiscal_years, &self.fiscal_years)
    }
}

impl SourceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl CrawlConfig {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn fiscal_year_delay(&self) -> Duration {
        Duration::from_millis(self.fiscal_year_delay_ms)
    }

    pub fn category_delay(&self) -> Duration {
        Duration::from_millis(self.category_delay_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            crawl: CrawlConfig::default(),
            fiscal_years: default_fiscal_years(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            request_timeout_ms: default_request_timeout_ms(),
            transport_retries: 0,
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            categories: default_categories(),
            use_fiscal_years: true,
            max_pages: default_max_pages(),
            page_delay_ms: default_page_delay_ms(),
            fiscal_year_delay_ms: default_fiscal_year_delay_ms(),
            category_delay_ms: default_category_delay_ms(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            json_path: default_json_path(),
            database_path: None,
            summary_path: None,
        }
    }
}

fn default_base_url() -> String {
    "https://ciaa.gov.np".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36".to_string()
}

fn default_request_timeout_ms() -> u64 {
    15_000
}

fn default_retry_backoff_ms() -> u64 {
    2_000
}

fn default_categories() -> Vec<String> {
    Category::DEFAULT
        .iter()
        .map(|c| c.key().to_string())
        .collect()
}

fn default_true() -> bool {
    true
}

fn default_max_pages() -> u32 {
    20
}

fn default_page_delay_ms() -> u64 {
    1_500
}

fn default_fiscal_year_delay_ms() -> u64 {
    2_000
}

fn default_category_delay_ms() -> u64 {
    3_000
}

fn default_json_path() -> String {
    "ciaa-historical-cases.json".to_string()
}
