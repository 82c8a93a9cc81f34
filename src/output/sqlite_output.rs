//! SQLite output sink
//!
//! This module provides a sink that upserts the record set into the case
//! database as one tracked import run.

use crate::output::json::check_writable;
use crate::output::traits::{OutputError, OutputResult, OutputSink, SinkReport};
use crate::record::CaseRecord;
use crate::storage::{import_records, SqliteStorage};
use std::path::PathBuf;

/// SQLite-based output sink
///
/// The database is opened in [`OutputSink::prepare`] and reused by every
/// subsequent write. Records are keyed by detail URL, so rerunning a crawl
/// updates existing rows instead of duplicating them.
pub struct SqliteSink {
    path: PathBuf,
    config_hash: String,
    source: String,
    storage: Option<SqliteStorage>,
}

impl SqliteSink {
    /// Creates a new SQLite sink
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `config_hash` - Hash of the configuration the records came from
    /// * `source` - Where the records came from, e.g. `crawl` or a JSON path
    pub fn new(path: impl Into<PathBuf>, config_hash: &str, source: &str) -> Self {
        Self {
            path: path.into(),
            config_hash: config_hash.to_string(),
            source: source.to_string(),
            storage: None,
        }
    }

    fn open(&mut self) -> OutputResult<&mut SqliteStorage> {
        if self.storage.is_none() {
            let storage = SqliteStorage::new(&self.path).map_err(|e| OutputError::Unwritable {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })?;
            self.storage = Some(storage);
        }

        self.storage
            .as_mut()
            .ok_or_else(|| OutputError::Write("database not open".to_string()))
    }
}

impl OutputSink for SqliteSink {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn prepare(&mut self) -> OutputResult<()> {
        if !self.path.exists() {
            check_writable(&self.path)?;
        }
        self.open()?;
        Ok(())
    }

    fn write(&mut self, records: &[CaseRecord]) -> OutputResult<SinkReport> {
        let config_hash = self.config_hash.clone();
        let source = self.source.clone();
        let storage = self.open()?;

        let (run_id, counts) = import_records(storage, records, &config_hash, &source)?;
        tracing::debug!("SQLite import run {} stored {} records", run_id, counts.total());

        Ok(SinkReport {
            sink: self.name(),
            target: self.path.display().to_string(),
            written: records.len(),
            inserted: Some(counts.inserted),
            updated: Some(counts.updated),
            errored: Some(counts.errored),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Category, CategoryType};
    use crate::storage::CaseStore;
    use chrono::Utc;
    use tempfile::TempDir;

    fn record(detail: &str, title: &str) -> CaseRecord {
        CaseRecord {
            id: detail.to_string(),
            category: Category::Appeal,
            category_type: CategoryType::Appeal,
            fiscal_year: "2081/82".to_string(),
            fiscal_year_gregorian: Some("2024/25".to_string()),
            date: "2081-05-01".to_string(),
            date_parsed: true,
            title: title.to_string(),
            accused_person: "A".to_string(),
            office: "O".to_string(),
            accusation: "Bribery".to_string(),
            amount: String::new(),
            detail_url: Some(format!("https://ciaa.gov.np/pressrelease/{}", detail)),
            download_links: vec![],
            scraped_at: Utc::now(),
            source_url: "https://ciaa.gov.np/pressreleaseCategory/appeal".to_string(),
        }
    }

    #[test]
    fn test_rerun_updates_instead_of_duplicating() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cases.db");
        let mut sink = SqliteSink::new(&path, "hash", "crawl");
        sink.prepare().unwrap();

        let first = sink.write(&[record("1", "old"), record("2", "b")]).unwrap();
        assert_eq!(first.inserted, Some(2));
        assert_eq!(first.updated, Some(0));

        let second = sink.write(&[record("1", "new"), record("3", "c")]).unwrap();
        assert_eq!(second.inserted, Some(1));
        assert_eq!(second.updated, Some(1));

        let storage = SqliteStorage::new(&path).unwrap();
        assert_eq!(storage.count_cases().unwrap(), 3);
    }

    #[test]
    fn test_prepare_rejects_directory_target() {
        let dir = TempDir::new().unwrap();
        let mut sink = SqliteSink::new(dir.path(), "hash", "crawl");
        assert!(matches!(
            sink.prepare(),
            Err(OutputError::Unwritable { .. })
        ));
    }
}
