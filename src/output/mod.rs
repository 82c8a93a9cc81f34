//! Output module for persisting crawl results
//!
//! This module handles:
//! - Suppressing duplicate records before anything is written
//! - Writing the record set to JSON and SQLite sinks atomically
//! - Rendering markdown summaries and console statistics

mod json;
mod markdown;
mod sqlite_output;
pub mod stats;
mod traits;

pub use json::{read_records, JsonFileSink};
pub use markdown::{format_markdown_summary, write_markdown_summary};
pub use sqlite_output::SqliteSink;
pub use stats::{
    analyze, load_statistics, print_analysis, print_run_summary, print_statistics, Analysis,
    StoreStatistics, DEFAULT_TOP_N,
};
pub use traits::{OutputError, OutputResult, OutputSink, RunSummary, SinkReport};

use crate::record::CaseRecord;
use crate::ConfigError;
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Drops records whose dedup key was already seen
///
/// The key is the detail URL when present, else the id. The first
/// occurrence wins and input order is kept.
///
/// # Returns
///
/// The unique records and the number of duplicates removed
pub fn dedup_records(records: Vec<CaseRecord>) -> (Vec<CaseRecord>, usize) {
    let total = records.len();
    let mut seen = HashSet::with_capacity(total);
    let unique: Vec<CaseRecord> = records
        .into_iter()
        .filter(|record| seen.insert(record.dedup_key().to_string()))
        .collect();

    let duplicates = total - unique.len();
    if duplicates > 0 {
        tracing::info!("Suppressed {} duplicate records", duplicates);
    }
    (unique, duplicates)
}

/// Checks every sink before any network activity
///
/// An unwritable target is a configuration problem, reported as
/// [`ConfigError::UnwritableOutput`].
pub fn preflight(sinks: &mut [Box<dyn OutputSink>]) -> Result<(), ConfigError> {
    for sink in sinks.iter_mut() {
        sink.prepare().map_err(|e| match e {
            OutputError::Unwritable { path, reason } => {
                ConfigError::UnwritableOutput(format!("{}: {}", path, reason))
            }
            other => ConfigError::UnwritableOutput(other.to_string()),
        })?;
        tracing::debug!("Output sink {} ready", sink.name());
    }
    Ok(())
}

/// Hands the record set to every sink in order
///
/// Stops at the first failing sink; sinks already written keep their
/// output.
pub fn write_all(
    sinks: &mut [Box<dyn OutputSink>],
    records: &[CaseRecord],
) -> OutputResult<Vec<SinkReport>> {
    let mut reports = Vec::with_capacity(sinks.len());
    for sink in sinks.iter_mut() {
        reports.push(sink.write(records)?);
    }
    Ok(reports)
}

/// Scratch path next to `path`, on the same filesystem
pub(crate) fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}

/// Writes `bytes` to `path` so readers never see a partial file
///
/// The content goes to a scratch file that is synced and then renamed over
/// the target. On failure the scratch file is removed and any previous
/// content at `path` is left untouched.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let tmp = temp_path_for(path);
    let result = (|| {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        std::fs::rename(&tmp, path)
    })();

    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result
}
