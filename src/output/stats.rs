//! Statistics over case records
//!
//! This module provides:
//! - Amount statistics over every monetary observation in titles
//! - The `--analyze` report over a JSON record file
//! - The `--stats` report over the SQLite case store
//! - The end-of-run console summary

use crate::crawler::CrawlReport;
use crate::output::traits::{RunSummary, SinkReport};
use crate::record::CaseRecord;
use crate::storage::{CaseStore, ImportRunRecord, StorageResult};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Default number of entries in top-N lists
pub const DEFAULT_TOP_N: usize = 10;

/// One monetary observation extracted from a title
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmountObservation {
    pub amount: f64,
    pub record_id: String,
    pub category: String,
    pub title: String,
}

/// Aggregate statistics over amount observations
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmountStatistics {
    /// Number of observations (a title may contribute several)
    pub observations: usize,

    /// Number of records contributing at least one observation
    pub records_with_amounts: usize,

    pub total: f64,
    pub average: Option<f64>,
    pub max: Option<f64>,
    pub min: Option<f64>,

    /// Largest observations, descending
    pub top: Vec<AmountObservation>,
}

impl AmountStatistics {
    /// Collects every amount in every title
    pub fn from_records(records: &[CaseRecord], top_n: usize) -> Self {
        let mut observations: Vec<AmountObservation> = Vec::new();
        let mut records_with_amounts = 0;

        for record in records {
            let amounts = record.title_amounts();
            if !amounts.is_empty() {
                records_with_amounts += 1;
            }
            observations.extend(amounts.into_iter().map(|amount| AmountObservation {
                amount,
                record_id: record.id.clone(),
                category: record.category.display_name().to_string(),
                title: record.title.clone(),
            }));
        }

        let total: f64 = observations.iter().map(|o| o.amount).sum();
        let count = observations.len();
        let max = observations.iter().map(|o| o.amount).reduce(f64::max);
        let min = observations.iter().map(|o| o.amount).reduce(f64::min);

        observations.sort_by(|a, b| b.amount.partial_cmp(&a.amount).unwrap_or(Ordering::Equal));
        observations.truncate(top_n);

        Self {
            observations: count,
            records_with_amounts,
            total,
            average: (count > 0).then(|| total / count as f64),
            max,
            min,
            top: observations,
        }
    }
}

/// Analysis of a record set (the `--analyze` report)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub total_cases: usize,
    pub by_category: BTreeMap<String, usize>,

    /// Accusation -> count, most frequent first
    pub by_accusation: Vec<(String, usize)>,

    pub amounts: AmountStatistics,

    /// Earliest and latest non-empty date strings, compared lexicographically
    pub date_range: Option<(String, String)>,

    pub with_detail_url: usize,
}

impl Analysis {
    /// Share of records with a detail URL, in percent
    pub fn detail_url_coverage(&self) -> f64 {
        if self.total_cases == 0 {
            return 0.0;
        }
        (self.with_detail_url as f64 / self.total_cases as f64) * 100.0
    }
}

/// Label used for records with an empty accusation column
const UNSPECIFIED_ACCUSATION: &str = "Not specified";

/// Analyzes a record set
pub fn analyze(records: &[CaseRecord], top_n: usize) -> Analysis {
    let mut by_category = BTreeMap::new();
    let mut accusations: BTreeMap<String, usize> = BTreeMap::new();

    for record in records {
        *by_category
            .entry(record.category.display_name().to_string())
            .or_default() += 1;

        let accusation = match record.accusation.trim() {
            "" => UNSPECIFIED_ACCUSATION,
            other => other,
        };
        *accusations.entry(accusation.to_string()).or_default() += 1;
    }

    let mut by_accusation: Vec<(String, usize)> = accusations.into_iter().collect();
    by_accusation.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let dates = records
        .iter()
        .map(|r| r.date.trim())
        .filter(|d| !d.is_empty());
    let date_range = dates
        .clone()
        .min()
        .zip(dates.max())
        .map(|(earliest, latest)| (earliest.to_string(), latest.to_string()));

    Analysis {
        total_cases: records.len(),
        by_category,
        by_accusation,
        amounts: AmountStatistics::from_records(records, top_n),
        date_range,
        with_detail_url: records.iter().filter(|r| r.detail_url.is_some()).count(),
    }
}

/// Case store statistics (the `--stats` report)
#[derive(Debug, Clone)]
pub struct StoreStatistics {
    pub total_cases: u64,
    pub with_amount: u64,
    pub by_category: Vec<(String, u64)>,
    pub by_fiscal_year: Vec<(String, u64)>,
    pub latest_run: Option<ImportRunRecord>,
}

/// Loads statistics from a case store
///
/// # Arguments
///
/// * `store` - The store to query
///
/// # Returns
///
/// * `Ok(StoreStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_statistics(store: &dyn CaseStore) -> StorageResult<StoreStatistics> {
    Ok(StoreStatistics {
        total_cases: store.count_cases()?,
        with_amount: store.count_with_amount()?,
        by_category: store.count_by_category()?,
        by_fiscal_year: store.count_by_fiscal_year()?,
        latest_run: store.get_latest_import_run()?,
    })
}

/// Formats an amount with Indian digit grouping, e.g. `1,25,66,555.50`
pub fn format_rupees(amount: f64) -> String {
    let formatted = format!("{:.2}", amount.abs());
    let (integer, fraction) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::new();
    let len = integer.len();
    for (i, c) in integer.chars().enumerate() {
        let remaining = len - i;
        if i > 0 && (remaining == 3 || (remaining > 3 && (remaining - 3) % 2 == 0)) {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, fraction)
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64) * 100.0
    }
}

fn print_amounts(amounts: &AmountStatistics) {
    println!("Amounts in titles:");
    println!(
        "  Observations: {} (from {} cases)",
        amounts.observations, amounts.records_with_amounts
    );
    if let (Some(avg), Some(max), Some(min)) = (amounts.average, amounts.max, amounts.min) {
        println!("  Total: Rs {}", format_rupees(amounts.total));
        println!("  Average: Rs {}", format_rupees(avg));
        println!("  Largest: Rs {}", format_rupees(max));
        println!("  Smallest: Rs {}", format_rupees(min));
    }
    println!();

    if !amounts.top.is_empty() {
        println!("Top {} by amount:", amounts.top.len());
        for (i, obs) in amounts.top.iter().enumerate() {
            let title: String = obs.title.chars().take(100).collect();
            println!(
                "  {}. Rs {} - {}",
                i + 1,
                format_rupees(obs.amount),
                obs.category
            );
            println!("     {}", title);
        }
        println!();
    }
}

/// Prints an analysis to stdout in a formatted manner
pub fn print_analysis(analysis: &Analysis) {
    println!("=== Case Analysis ===\n");
    println!("Total cases: {}\n", analysis.total_cases);

    println!("Cases by Category:");
    for (category, count) in &analysis.by_category {
        println!("  {}: {}", category, count);
    }
    println!();

    println!("Cases by Accusation:");
    for (accusation, count) in &analysis.by_accusation {
        println!("  {}: {}", accusation, count);
    }
    println!();

    print_amounts(&analysis.amounts);

    if let Some((earliest, latest)) = &analysis.date_range {
        println!("Date Range:");
        println!("  Earliest: {}", earliest);
        println!("  Latest: {}", latest);
        println!();
    }

    println!(
        "Cases with detail URLs: {} ({:.0}%)",
        analysis.with_detail_url,
        analysis.detail_url_coverage()
    );
}

/// Prints the end-of-run summary to stdout
pub fn print_run_summary(report: &CrawlReport, summary: &RunSummary, sinks: &[SinkReport]) {
    println!("\n=== Crawl Summary ===\n");
    if report.cancelled {
        println!("Run was cancelled; partial results follow.\n");
    }

    println!(
        "Records: {} unique ({} extracted, {} duplicates)",
        summary.total_records, report.total_records, summary.duplicates
    );
    println!(
        "Pages: {} fetched, {} failed",
        report.pages_fetched, report.failed_fetches
    );
    println!(
        "Rows: {} skipped, {} empty, {} errored",
        report.skipped_rows, report.empty_rows, report.row_errors
    );
    println!(
        "With amount: {} ({:.1}%)",
        summary.with_amount,
        percentage(summary.with_amount as u64, summary.total_records as u64)
    );
    println!();

    println!("By Category:");
    for (category, count) in &summary.by_category {
        println!("  {}: {}", category, count);
    }
    println!();

    println!("By Fiscal Year:");
    for (fiscal_year, count) in summary.by_fiscal_year.iter().rev() {
        println!("  {}: {}", fiscal_year, count);
    }
    println!();

    if summary.amounts.observations > 0 {
        print_amounts(&summary.amounts);
    }

    for sink in sinks {
        match (sink.inserted, sink.updated, sink.errored) {
            (Some(inserted), Some(updated), Some(errored)) => println!(
                "Saved to {} ({}): {} inserted, {} updated, {} errored",
                sink.target, sink.sink, inserted, updated, errored
            ),
            _ => println!(
                "Saved {} records to {} ({})",
                sink.written, sink.target, sink.sink
            ),
        }
    }
}

/// Prints store statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Case Store Statistics ===\n");

    println!("Overview:");
    println!("  Total cases: {}", stats.total_cases);
    println!(
        "  With amount: {} ({:.1}%)",
        stats.with_amount,
        percentage(stats.with_amount, stats.total_cases)
    );
    println!();

    println!("Cases by Category:");
    for (category, count) in &stats.by_category {
        println!(
            "  {}: {} ({:.1}%)",
            category,
            count,
            percentage(*count, stats.total_cases)
        );
    }
    println!();

    println!("Cases by Fiscal Year:");
    for (fiscal_year, count) in &stats.by_fiscal_year {
        println!("  {}: {}", fiscal_year, count);
    }
    println!();

    if let Some(run) = &stats.latest_run {
        println!("Latest import run #{} ({}):", run.id, run.status.to_db_string());
        println!("  Source: {}", run.source);
        println!("  Started: {}", run.started_at);
        if let Some(finished) = &run.finished_at {
            println!("  Finished: {}", finished);
        }
        println!(
            "  Inserted: {}, updated: {}, errored: {}",
            run.counts.inserted, run.counts.updated, run.counts.errored
        );
        println!("  Config hash: {}", run.config_hash);
    }
}
