//! Run-scoped record accumulation and progress counters

use crate::crawler::pacer::DelayCounts;
use crate::crawler::parser::ExtractedPage;
use crate::record::{CaseRecord, Category, FiscalYearFilter};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Outcome of one (category, fiscal year) pagination run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairReport {
    pub category: Category,
    pub fiscal_year: String,
    pub pages_fetched: u32,
    pub records: usize,
    pub failed_fetches: u32,
}

/// Final report of a crawl run
///
/// Counts are taken before deduplication; the output sink reports what it
/// suppressed separately.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_records: usize,
    pub by_category: BTreeMap<Category, usize>,
    pub by_fiscal_year: BTreeMap<String, usize>,
    pub pairs: Vec<PairReport>,
    pub pages_fetched: u32,
    pub failed_fetches: u32,
    pub skipped_rows: usize,
    pub empty_rows: usize,
    pub row_errors: usize,
    pub page_delays: u32,
    pub fiscal_year_delays: u32,
    pub category_delays: u32,
    pub cancelled: bool,
}

impl CrawlReport {
    /// Records contributed by one (category, fiscal-year label) pair
    pub fn records_for(&self, category: Category, fiscal_year: &str) -> Option<usize> {
        self.pairs
            .iter()
            .find(|p| p.category == category && p.fiscal_year == fiscal_year)
            .map(|p| p.records)
    }
}

/// Owns the records and counters of exactly one crawl run
///
/// Records are only ever appended.
#[derive(Debug)]
pub struct Accumulator {
    started_at: DateTime<Utc>,
    records: Vec<CaseRecord>,
    by_category: BTreeMap<Category, usize>,
    by_fiscal_year: BTreeMap<String, usize>,
    pairs: Vec<PairReport>,
    pages_fetched: u32,
    failed_fetches: u32,
    skipped_rows: usize,
    empty_rows: usize,
    row_errors: usize,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Accumulator {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            records: Vec::new(),
            by_category: BTreeMap::new(),
            by_fiscal_year: BTreeMap::new(),
            pairs: Vec::new(),
            pages_fetched: 0,
            failed_fetches: 0,
            skipped_rows: 0,
            empty_rows: 0,
            row_errors: 0,
        }
    }

    /// Opens the counters of a new (category, fiscal year) pair
    pub fn begin_pair(&mut self, category: Category, fiscal_year: &FiscalYearFilter) {
        self.pairs.push(PairReport {
            category,
            fiscal_year: fiscal_year.label().to_string(),
            pages_fetched: 0,
            records: 0,
            failed_fetches: 0,
        });
    }

    /// Appends one extracted page to the current pair
    ///
    /// Returns the number of records the page contributed.
    pub fn record_page(&mut self, page: ExtractedPage) -> usize {
        let count = page.records.len();

        self.pages_fetched += 1;
        self.skipped_rows += page.skipped_rows;
        self.empty_rows += page.empty_rows;
        self.row_errors += page.row_errors.len();

        for record in &page.records {
            *self.by_category.entry(record.category).or_default() += 1;
            *self
                .by_fiscal_year
                .entry(record.fiscal_year.clone())
                .or_default() += 1;
        }

        if let Some(pair) = self.pairs.last_mut() {
            pair.pages_fetched += 1;
            pair.records += count;
        }

        self.records.extend(page.records);
        count
    }

    pub fn record_failed_fetch(&mut self) {
        self.failed_fetches += 1;
        if let Some(pair) = self.pairs.last_mut() {
            pair.failed_fetches += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Consumes the accumulator into the records and the final report
    pub fn finish(self, delays: DelayCounts, cancelled: bool) -> (Vec<CaseRecord>, CrawlReport) {
        let report = CrawlReport {
            started_at: self.started_at,
            finished_at: Utc::now(),
            total_records: self.records.len(),
            by_category: self.by_category,
            by_fiscal_year: self.by_fiscal_year,
            pairs: self.pairs,
            pages_fetched: self.pages_fetched,
            failed_fetches: self.failed_fetches,
            skipped_rows: self.skipped_rows,
            empty_rows: self.empty_rows,
            row_errors: self.row_errors,
            page_delays: delays.page,
            fiscal_year_delays: delays.fiscal_year,
            category_delays: delays.category,
            cancelled,
        };
        (self.records, report)
    }
}
