//! Markdown summary generation
//!
//! This module renders a human-readable report of one run: crawl progress,
//! per-dimension counts, amount statistics and what each sink stored.

use crate::crawler::CrawlReport;
use crate::output::stats::format_rupees;
use crate::output::traits::{OutputResult, RunSummary, SinkReport};
use crate::output::write_atomic;
use std::path::Path;

/// Writes the markdown summary of a run
///
/// # Arguments
///
/// * `report` - The crawl report
/// * `summary` - Summary of the deduplicated record set
/// * `sinks` - What each sink did with the records
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn write_markdown_summary(
    report: &CrawlReport,
    summary: &RunSummary,
    sinks: &[SinkReport],
    output_path: &Path,
) -> OutputResult<()> {
    let markdown = format_markdown_summary(report, summary, sinks);
    write_atomic(output_path, markdown.as_bytes())?;
    Ok(())
}

/// Formats a run as markdown
pub fn format_markdown_summary(
    report: &CrawlReport,
    summary: &RunSummary,
    sinks: &[SinkReport],
) -> String {
    let mut md = String::new();

    md.push_str("# CIAA Crawl Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Started**: {}\n", report.started_at.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", report.finished_at.to_rfc3339()));
    let duration = report.finished_at - report.started_at;
    md.push_str(&format!(
        "- **Duration**: {} seconds ({:.2} minutes)\n",
        duration.num_seconds(),
        duration.num_seconds() as f64 / 60.0
    ));
    let status = if report.cancelled { "cancelled" } else { "completed" };
    md.push_str(&format!("- **Status**: {}\n\n", status));

    // Overall statistics
    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Records Extracted**: {}\n", report.total_records));
    md.push_str(&format!("- **Unique Records**: {}\n", summary.total_records));
    md.push_str(&format!("- **Duplicates Suppressed**: {}\n", summary.duplicates));
    md.push_str(&format!("- **Records With Amount**: {}\n", summary.with_amount));
    md.push_str(&format!("- **Pages Fetched**: {}\n", report.pages_fetched));
    md.push_str(&format!("- **Failed Fetches**: {}\n", report.failed_fetches));
    md.push_str(&format!("- **Rows Skipped**: {}\n", report.skipped_rows));
    md.push_str(&format!("- **Empty Rows**: {}\n", report.empty_rows));
    md.push_str(&format!("- **Row Errors**: {}\n\n", report.row_errors));

    md.push_str("## Courtesy Delays\n\n");
    md.push_str("| Kind | Count |\n");
    md.push_str("|------|-------|\n");
    md.push_str(&format!("| Page | {} |\n", report.page_delays));
    md.push_str(&format!("| Fiscal Year | {} |\n", report.fiscal_year_delays));
    md.push_str(&format!("| Category | {} |\n\n", report.category_delays));

    if !summary.by_category.is_empty() {
        md.push_str("## Records by Category\n\n");
        md.push_str("| Category | Records |\n");
        md.push_str("|----------|---------|\n");
        for (category, count) in &summary.by_category {
            md.push_str(&format!("| {} | {} |\n", category, count));
        }
        md.push('\n');
    }

    if !summary.by_fiscal_year.is_empty() {
        md.push_str("## Records by Fiscal Year\n\n");
        md.push_str("| Fiscal Year | Records |\n");
        md.push_str("|-------------|---------|\n");
        // Newest year first
        for (fiscal_year, count) in summary.by_fiscal_year.iter().rev() {
            md.push_str(&format!("| {} | {} |\n", fiscal_year, count));
        }
        md.push('\n');
    }

    if !report.pairs.is_empty() {
        md.push_str("## Pagination\n\n");
        md.push_str("| Category | Fiscal Year | Pages | Records | Failed Fetches |\n");
        md.push_str("|----------|-------------|-------|---------|----------------|\n");
        for pair in &report.pairs {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                pair.category.display_name(),
                pair.fiscal_year,
                pair.pages_fetched,
                pair.records,
                pair.failed_fetches
            ));
        }
        md.push('\n');
    }

    let amounts = &summary.amounts;
    if amounts.observations > 0 {
        md.push_str("## Amounts\n\n");
        md.push_str(&format!(
            "- **Observations**: {} across {} records\n",
            amounts.observations, amounts.records_with_amounts
        ));
        md.push_str(&format!("- **Total**: {}\n", format_rupees(amounts.total)));
        for (label, value) in [
            ("Average", amounts.average),
            ("Largest", amounts.max),
            ("Smallest", amounts.min),
        ] {
            if let Some(value) = value {
                md.push_str(&format!("- **{}**: {}\n", label, format_rupees(value)));
            }
        }
        md.push('\n');

        if !amounts.top.is_empty() {
            md.push_str(&format!("### Top {} Amounts\n\n", amounts.top.len()));
            md.push_str("| Amount | Category | Title |\n");
            md.push_str("|--------|----------|-------|\n");
            for obs in &amounts.top {
                md.push_str(&format!(
                    "| {} | {} | {} |\n",
                    format_rupees(obs.amount),
                    obs.category,
                    escape_cell(&obs.title)
                ));
            }
            md.push('\n');
        }
    }

    if !sinks.is_empty() {
        md.push_str("## Outputs\n\n");
        md.push_str("| Sink | Target | Records | Inserted | Updated | Errored |\n");
        md.push_str("|------|--------|---------|----------|---------|---------|\n");
        for sink in sinks {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} |\n",
                sink.sink,
                sink.target,
                sink.written,
                optional_count(sink.inserted),
                optional_count(sink.updated),
                optional_count(sink.errored)
            ));
        }
        md.push('\n');
    }

    md
}

fn optional_count(count: Option<u64>) -> String {
    count.map_or_else(|| "-".to_string(), |c| c.to_string())
}

/// Keeps free text from breaking a table row
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::PairReport;
    use crate::output::stats::{AmountObservation, AmountStatistics};
    use crate::record::Category;
    use chrono::{Duration, Utc};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn create_test_report() -> CrawlReport {
        let started_at = Utc::now();
        CrawlReport {
            started_at,
            finished_at: started_at + Duration::seconds(120),
            total_records: 12,
            by_category: BTreeMap::new(),
            by_fiscal_year: BTreeMap::new(),
            pairs: vec![PairReport {
                category: Category::ChargeSheet,
                fiscal_year: "2082/83".to_string(),
                pages_fetched: 2,
                records: 12,
                failed_fetches: 0,
            }],
            pages_fetched: 2,
            failed_fetches: 0,
            skipped_rows: 1,
            empty_rows: 0,
            row_errors: 0,
            page_delays: 1,
            fiscal_year_delays: 0,
            category_delays: 0,
            cancelled: false,
        }
    }

    fn create_test_summary() -> RunSummary {
        let mut by_category = BTreeMap::new();
        by_category.insert("Charge Sheet".to_string(), 10);
        let mut by_fiscal_year = BTreeMap::new();
        by_fiscal_year.insert("2081/82".to_string(), 4);
        by_fiscal_year.insert("2082/83".to_string(), 6);

        RunSummary {
            total_records: 10,
            duplicates: 2,
            with_amount: 3,
            by_category,
            by_fiscal_year,
            amounts: AmountStatistics::default(),
        }
    }

    #[test]
    fn test_format_markdown_summary() {
        let markdown = format_markdown_summary(&create_test_report(), &create_test_summary(), &[]);

        assert!(markdown.contains("# CIAA Crawl Summary"));
        assert!(markdown.contains("- **Duration**: 120 seconds"));
        assert!(markdown.contains("- **Status**: completed"));
        assert!(markdown.contains("- **Unique Records**: 10"));
        assert!(markdown.contains("- **Duplicates Suppressed**: 2"));
        assert!(markdown.contains("| Charge Sheet | 10 |"));
        assert!(markdown.contains("| Charge Sheet | 2082/83 | 2 | 12 | 0 |"));
        assert!(!markdown.contains("## Amounts"));
        assert!(!markdown.contains("## Outputs"));
    }

    #[test]
    fn test_fiscal_years_newest_first() {
        let markdown = format_markdown_summary(&create_test_report(), &create_test_summary(), &[]);
        let newer = markdown.find("| 2082/83 | 6 |").unwrap();
        let older = markdown.find("| 2081/82 | 4 |").unwrap();
        assert!(newer < older);
    }

    #[test]
    fn test_markdown_with_amounts_and_sinks() {
        let mut summary = create_test_summary();
        summary.amounts = AmountStatistics {
            observations: 1,
            records_with_amounts: 1,
            total: 150000.0,
            average: Some(150000.0),
            max: Some(150000.0),
            min: Some(150000.0),
            top: vec![AmountObservation {
                amount: 150000.0,
                record_id: "1".to_string(),
                category: "Charge Sheet".to_string(),
                title: "a | b".to_string(),
            }],
        };
        let sinks = vec![SinkReport {
            sink: "sqlite",
            target: "cases.db".to_string(),
            written: 10,
            inserted: Some(7),
            updated: Some(3),
            errored: Some(0),
        }];

        let markdown = format_markdown_summary(&create_test_report(), &summary, &sinks);

        assert!(markdown.contains("## Amounts"));
        assert!(markdown.contains("a \\| b"));
        assert!(markdown.contains("| sqlite | cases.db | 10 | 7 | 3 | 0 |"));
    }

    #[test]
    fn test_cancelled_status() {
        let mut report = create_test_report();
        report.cancelled = true;
        let markdown = format_markdown_summary(&report, &create_test_summary(), &[]);
        assert!(markdown.contains("- **Status**: cancelled"));
    }

    #[test]
    fn test_write_markdown_summary() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("summary.md");
        write_markdown_summary(&create_test_report(), &create_test_summary(), &[], &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# CIAA Crawl Summary"));
    }
}
