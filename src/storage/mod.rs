//! Storage module for persisting case records
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Upserting case records by detail URL
//! - Import run tracking with config hashes and counts
//! - Aggregate queries for the statistics report

mod schema;
mod sqlite;
mod traits;

pub use sqlite::{init_database, SqliteStorage};
pub use traits::{CaseStore, StorageError, StorageResult};

use crate::record::CaseRecord;

/// Outcome counts of one upsert batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertCounts {
    pub inserted: u64,
    pub updated: u64,
    pub errored: u64,
}

impl UpsertCounts {
    pub fn total(&self) -> u64 {
        self.inserted + self.updated + self.errored
    }
}

/// Represents an import run
#[derive(Debug, Clone)]
pub struct ImportRunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub source: String,
    pub status: ImportRunStatus,
    pub counts: UpsertCounts,
}

/// Status of an import run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportRunStatus {
    Running,
    Completed,
    Failed,
}

impl ImportRunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Imports a record set as one tracked run
///
/// Opens an import run, upserts every record in one transaction and closes
/// the run as completed, or as failed if the batch could not be written.
pub fn import_records(
    store: &mut dyn CaseStore,
    records: &[CaseRecord],
    config_hash: &str,
    source: &str,
) -> StorageResult<(i64, UpsertCounts)> {
    let run_id = store.begin_import(config_hash, source)?;

    match store.upsert_cases(run_id, records) {
        Ok(counts) => {
            store.finish_import(run_id, ImportRunStatus::Completed, &counts)?;
            tracing::info!(
                "Import run {}: {} inserted, {} updated, {} errored",
                run_id,
                counts.inserted,
                counts.updated,
                counts.errored
            );
            Ok((run_id, counts))
        }
        Err(e) => {
            store.finish_import(run_id, ImportRunStatus::Failed, &UpsertCounts::default())?;
            Err(e)
        }
    }
}
