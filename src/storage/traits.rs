//! Storage traits and error types
//!
//! This module defines the trait interface for case stores and
//! associated error types.

use crate::record::CaseRecord;
use crate::storage::{ImportRunRecord, ImportRunStatus, UpsertCounts};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Import run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid stored value in column {column}: {value}")]
    InvalidValue { column: &'static str, value: String },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for persistent case stores
///
/// Implementations upsert by detail URL; records without one are always
/// inserted.
pub trait CaseStore {
    // ===== Import Runs =====

    /// Opens a new import run
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration that produced the records
    /// * `source` - Where the records came from (a crawl or a JSON path)
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn begin_import(&mut self, config_hash: &str, source: &str) -> StorageResult<i64>;

    /// Closes an import run with its final status and counts
    fn finish_import(
        &mut self,
        run_id: i64,
        status: ImportRunStatus,
        counts: &UpsertCounts,
    ) -> StorageResult<()>;

    /// Gets an import run by ID
    fn get_import_run(&self, run_id: i64) -> StorageResult<ImportRunRecord>;

    /// Gets the most recent import run
    fn get_latest_import_run(&self) -> StorageResult<Option<ImportRunRecord>>;

    // ===== Cases =====

    /// Upserts a batch of records inside one transaction
    ///
    /// A record that fails to write is counted as errored and skipped; the
    /// rest of the batch still commits.
    fn upsert_cases(&mut self, run_id: i64, records: &[CaseRecord]) -> StorageResult<UpsertCounts>;

    /// Gets a case by its detail URL
    fn get_case_by_detail_url(&self, detail_url: &str) -> StorageResult<Option<CaseRecord>>;

    /// Loads every stored case in insertion order
    fn load_cases(&self) -> StorageResult<Vec<CaseRecord>>;

    // ===== Statistics =====

    /// Counts stored cases
    fn count_cases(&self) -> StorageResult<u64>;

    /// Counts stored cases per category display name
    fn count_by_category(&self) -> StorageResult<Vec<(String, u64)>>;

    /// Counts stored cases per fiscal-year label
    fn count_by_fiscal_year(&self) -> StorageResult<Vec<(String, u64)>>;

    /// Counts stored cases whose amount column is non-empty
    fn count_with_amount(&self) -> StorageResult<u64>;
}
