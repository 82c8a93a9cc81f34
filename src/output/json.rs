//! JSON file sink
//!
//! Writes the record set as one pretty-printed JSON array. The file is
//! written next to its final location and renamed into place, so readers
//! only ever see the previous complete file or the new complete file.

use crate::output::traits::{OutputError, OutputResult, OutputSink, SinkReport};
use crate::output::write_atomic;
use crate::record::CaseRecord;
use std::path::{Path, PathBuf};

/// Sink writing the record set to a JSON file
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OutputSink for JsonFileSink {
    fn name(&self) -> &'static str {
        "json"
    }

    fn prepare(&mut self) -> OutputResult<()> {
        check_writable(&self.path)
    }

    fn write(&mut self, records: &[CaseRecord]) -> OutputResult<SinkReport> {
        let json = serde_json::to_vec_pretty(records)?;
        write_atomic(&self.path, &json)?;

        tracing::info!("Wrote {} records to {}", records.len(), self.path.display());

        Ok(SinkReport {
            sink: self.name(),
            target: self.path.display().to_string(),
            written: records.len(),
            inserted: None,
            updated: None,
            errored: None,
        })
    }
}

/// Checks that a file can be created at `path` without touching it
///
/// Creates missing parent directories, then probes with a scratch file in
/// the same directory.
pub(crate) fn check_writable(path: &Path) -> OutputResult<()> {
    let unwritable = |reason: String| OutputError::Unwritable {
        path: path.display().to_string(),
        reason,
    };

    if path.is_dir() {
        return Err(unwritable("path is a directory".to_string()));
    }

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(|e| unwritable(e.to_string()))?;

    let probe = parent.join(format!(".ciaa-crawler-probe-{}", std::process::id()));
    std::fs::write(&probe, b"").map_err(|e| unwritable(e.to_string()))?;
    let _ = std::fs::remove_file(&probe);

    Ok(())
}

/// Reads a record set previously written by [`JsonFileSink`]
pub fn read_records(path: &Path) -> OutputResult<Vec<CaseRecord>> {
    let content = std::fs::read_to_string(path)?;
    let records = serde_json::from_str(&content)?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Category, CategoryType};
    use chrono::Utc;
    use tempfile::TempDir;

    fn record(id: &str) -> CaseRecord {
        CaseRecord {
            id: id.to_string(),
            category: Category::ChargeSheet,
            category_type: CategoryType::CourtFiling,
            fiscal_year: "current".to_string(),
            fiscal_year_gregorian: None,
            date: "2082-01-01".to_string(),
            date_parsed: true,
            title: "t".to_string(),
            accused_person: String::new(),
            office: String::new(),
            accusation: String::new(),
            amount: String::new(),
            detail_url: None,
            download_links: vec![],
            scraped_at: Utc::now(),
            source_url: "https://ciaa.gov.np/pressreleaseCategory/charge".to_string(),
        }
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("cases.json");
        let mut sink = JsonFileSink::new(&path);

        sink.prepare().unwrap();
        let report = sink.write(&[record("a"), record("b")]).unwrap();
        assert_eq!(report.written, 2);
        assert_eq!(report.sink, "json");

        let loaded = read_records(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, "a");
    }

    #[test]
    fn test_write_replaces_previous_file_and_leaves_no_temp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cases.json");
        let mut sink = JsonFileSink::new(&path);

        sink.write(&[record("old")]).unwrap();
        sink.write(&[record("new1"), record("new2")]).unwrap();

        let loaded = read_records(&path).unwrap();
        assert_eq!(loaded.len(), 2);

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_prepare_rejects_directory_target() {
        let dir = TempDir::new().unwrap();
        let mut sink = JsonFileSink::new(dir.path());
        assert!(matches!(
            sink.prepare(),
            Err(OutputError::Unwritable { .. })
        ));
    }

    #[test]
    fn test_failed_write_keeps_previous_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cases.json");
        std::fs::write(&path, "[]").unwrap();

        // A directory squatting on the temp location makes the write fail
        let mut sink = JsonFileSink::new(&path);
        std::fs::create_dir(crate::output::temp_path_for(&path)).unwrap();
        assert!(sink.write(&[record("x")]).is_err());

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    }
}
