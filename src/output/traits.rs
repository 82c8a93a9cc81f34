//! Output sink traits and types
//!
//! This module defines the trait interface for output sinks and the
//! per-run summary every sink reports against.

use crate::output::stats::AmountStatistics;
use crate::record::CaseRecord;
use crate::storage::StorageError;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Output target {path} is not writable: {reason}")]
    Unwritable { path: String, reason: String },

    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to format output: {0}")]
    Format(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// What one sink did with a record set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SinkReport {
    /// Sink name, e.g. `json` or `sqlite`
    pub sink: &'static str,

    /// Path or handle the records went to
    pub target: String,

    /// Records handed to the sink
    pub written: usize,

    /// Rows newly inserted (database sinks only)
    pub inserted: Option<u64>,

    /// Rows updated in place (database sinks only)
    pub updated: Option<u64>,

    /// Rows that failed to store (database sinks only)
    pub errored: Option<u64>,
}

/// Summary of the deduplicated record set of one run
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Records after deduplication
    pub total_records: usize,

    /// Records suppressed as duplicates
    pub duplicates: usize,

    /// Records with a non-empty amount column
    pub with_amount: usize,

    /// Category display name -> count
    pub by_category: BTreeMap<String, usize>,

    /// Fiscal-year label -> count
    pub by_fiscal_year: BTreeMap<String, usize>,

    /// Statistics over every amount observed in titles
    pub amounts: AmountStatistics,
}

impl RunSummary {
    /// Builds the summary of an already deduplicated record set
    pub fn from_records(records: &[CaseRecord], duplicates: usize, top_n: usize) -> Self {
        let mut by_category = BTreeMap::new();
        let mut by_fiscal_year = BTreeMap::new();

        for record in records {
            *by_category
                .entry(record.category.display_name().to_string())
                .or_default() += 1;
            *by_fiscal_year
                .entry(record.fiscal_year.clone())
                .or_default() += 1;
        }

        Self {
            total_records: records.len(),
            duplicates,
            with_amount: records.iter().filter(|r| r.has_amount()).count(),
            by_category,
            by_fiscal_year,
            amounts: AmountStatistics::from_records(records, top_n),
        }
    }
}

/// Trait for output sinks
///
/// `prepare` runs before any network activity, so an unwritable target
/// fails the run up front instead of after a multi-hour crawl. `write` must
/// be atomic in effect: either the whole record set lands, or the previous
/// output is left untouched.
pub trait OutputSink {
    /// Short sink name used in logs and reports
    fn name(&self) -> &'static str;

    /// Checks that the target can be written
    fn prepare(&mut self) -> OutputResult<()>;

    /// Persists the full record set
    ///
    /// # Arguments
    ///
    /// * `records` - The deduplicated records of the run
    fn write(&mut self, records: &[CaseRecord]) -> OutputResult<SinkReport>;
}
