//! Listing-page record extraction
//!
//! This module turns one fetched listing page into case records:
//! - Row iteration over `table tbody tr`
//! - Column mapping tolerant of 4-5 and 6+ cell layouts
//! - Detail and document link resolution
//! - Pagination (next-page control) detection
//!
//! `scraper::Html` is not `Send`, so every function here parses and drops the
//! document synchronously; nothing holds a parsed tree across an `.await`.

use crate::normalize::{normalize_date, normalize_date_slashed};
use crate::record::{CaseRecord, Category, FiscalYearFilter};
use crate::url::{is_document_link, last_path_segment, resolve_href};
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use thiserror::Error;
use url::Url;

/// Rows with fewer cells are headers, footers or spacers
pub const MIN_CELLS: usize = 4;

/// Rows with at least this many cells carry accusation and amount columns
pub const FULL_ROW_CELLS: usize = 6;

/// Texts that mark the last pagination anchor as a "next" control
const NEXT_MARKERS: &[&str] = &["Next", "»", "›"];

struct Selectors {
    row: Selector,
    cell: Selector,
    link: Selector,
    pagination_next: Selector,
    pagination_link: Selector,
}

fn selectors() -> &'static Selectors {
    static SELECTORS: OnceLock<Selectors> = OnceLock::new();
    SELECTORS.get_or_init(|| Selectors {
        row: Selector::parse("table tbody tr").expect("valid row selector"),
        cell: Selector::parse("td").expect("valid cell selector"),
        link: Selector::parse("a[href]").expect("valid link selector"),
        pagination_next: Selector::parse(r#".pagination a[rel="next"]"#)
            .expect("valid pagination selector"),
        pagination_link: Selector::parse(".pagination a").expect("valid pagination selector"),
    })
}

/// Row-level extraction failure
///
/// Recovered per row: the row is logged and skipped, the page continues.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowError {
    #[error("row {row}: missing cell {cell}")]
    MissingCell { row: usize, cell: usize },

    #[error("row {row}: invalid detail link '{href}': {source}")]
    InvalidDetailLink {
        row: usize,
        href: String,
        #[source]
        source: url::ParseError,
    },
}

/// Everything extracted from one listing page
#[derive(Debug, Clone, Default)]
pub struct ExtractedPage {
    /// Records that passed the emission rule, in row order
    pub records: Vec<CaseRecord>,

    /// Rows dropped for having fewer than [`MIN_CELLS`] cells
    pub skipped_rows: usize,

    /// Rows with neither a title nor an accused person
    pub empty_rows: usize,

    /// Rows that failed to extract
    pub row_errors: Vec<RowError>,
}

/// Context shared by every row of a page
struct PageContext<'a> {
    page_url: &'a Url,
    category: Category,
    fiscal_year: &'a FiscalYearFilter,
    page: u32,
    scraped_at: DateTime<Utc>,
}

/// Extracts case records from one listing page
///
/// # Arguments
///
/// * `html` - The fetched page markup
/// * `page_url` - The exact URL the page was fetched from; relative links
///   resolve against it and it becomes every record's `source_url`
/// * `category` - Category being crawled
/// * `fiscal_year` - Fiscal-year position of the traversal
/// * `page` - 1-based page number
///
/// # Example
///
/// ```
/// use ciaa_crawler::crawler::extract_page;
/// use ciaa_crawler::record::{Category, FiscalYearFilter};
/// use url::Url;
///
/// let html = r#"<table><tbody><tr>
///     <td>2082-01-05</td><td><a href="/pressrelease/991">Case</a></td>
///     <td>Ram</td><td>Office</td>
/// </tr></tbody></table>"#;
/// let url = Url::parse("https://ciaa.gov.np/pressreleaseCategory/charge").unwrap();
/// let page = extract_page(html, &url, Category::ChargeSheet, &FiscalYearFilter::Current, 1);
/// assert_eq!(page.records.len(), 1);
/// assert_eq!(page.records[0].id, "991");
/// ```
pub fn extract_page(
    html: &str,
    page_url: &Url,
    category: Category,
    fiscal_year: &FiscalYearFilter,
    page: u32,
) -> ExtractedPage {
    let document = Html::parse_document(html);
    let sel = selectors();
    let ctx = PageContext {
        page_url,
        category,
        fiscal_year,
        page,
        scraped_at: Utc::now(),
    };

    let mut extracted = ExtractedPage::default();

    for (row_index, row) in document.select(&sel.row).enumerate() {
        let cells: Vec<ElementRef> = row.select(&sel.cell).collect();
        if cells.len() < MIN_CELLS {
            extracted.skipped_rows += 1;
            continue;
        }

        match extract_row(&ctx, row_index, row, &cells) {
            Ok(Some(record)) => extracted.records.push(record),
            Ok(None) => extracted.empty_rows += 1,
            Err(e) => {
                tracing::warn!("Skipping row on {}: {}", page_url, e);
                extracted.row_errors.push(e);
            }
        }
    }

    extracted
}

/// Extracts one row; `Ok(None)` if the row has neither title nor accused
fn extract_row(
    ctx: &PageContext<'_>,
    row_index: usize,
    row: ElementRef<'_>,
    cells: &[ElementRef<'_>],
) -> Result<Option<CaseRecord>, RowError> {
    let date_text = cell_text(cells, row_index, 0)?;
    let title = cell_text(cells, row_index, 1)?;

    let (accused_person, office, accusation, amount) = if cells.len() >= FULL_ROW_CELLS {
        (
            cell_text(cells, row_index, 2)?,
            cell_text(cells, row_index, 3)?,
            cell_text(cells, row_index, 4)?,
            cell_text(cells, row_index, 5)?,
        )
    } else {
        (
            cell_text(cells, row_index, 2)?,
            cell_text(cells, row_index, 3)?,
            String::new(),
            String::new(),
        )
    };

    if title.is_empty() && accused_person.is_empty() {
        return Ok(None);
    }

    let detail_url = detail_link(ctx.page_url, row_index, cells[1])?;

    let date = if ctx.fiscal_year.is_historical() {
        normalize_date_slashed(&date_text)
    } else {
        normalize_date(&date_text)
    };

    let id = detail_url
        .as_ref()
        .and_then(last_path_segment)
        .unwrap_or_else(|| {
            CaseRecord::synthetic_id(ctx.category, ctx.fiscal_year, ctx.page, row_index)
        });

    Ok(Some(CaseRecord {
        id,
        category: ctx.category,
        category_type: ctx.category.category_type(),
        fiscal_year: ctx.fiscal_year.label().to_string(),
        fiscal_year_gregorian: ctx.fiscal_year.gregorian_label().map(str::to_string),
        date_parsed: date.is_parsed(),
        date: date.into_string(),
        title,
        accused_person,
        office,
        accusation,
        amount,
        detail_url: detail_url.map(String::from),
        download_links: document_links(ctx.page_url, row),
        scraped_at: ctx.scraped_at,
        source_url: ctx.page_url.to_string(),
    }))
}

fn cell_text(cells: &[ElementRef<'_>], row: usize, cell: usize) -> Result<String, RowError> {
    cells
        .get(cell)
        .map(|c| c.text().collect::<String>().trim().to_string())
        .ok_or(RowError::MissingCell { row, cell })
}

/// Resolves the first anchor of the title cell
fn detail_link(
    page_url: &Url,
    row: usize,
    title_cell: ElementRef<'_>,
) -> Result<Option<Url>, RowError> {
    let Some(href) = title_cell
        .select(&selectors().link)
        .next()
        .and_then(|a| a.value().attr("href"))
    else {
        return Ok(None);
    };

    resolve_href(href, page_url).map_err(|source| RowError::InvalidDetailLink {
        row,
        href: href.to_string(),
        source,
    })
}

/// Collects document attachments anywhere in the row, in order, without repeats
fn document_links(page_url: &Url, row: ElementRef<'_>) -> Vec<String> {
    let mut links: Vec<String> = Vec::new();

    for anchor in row.select(&selectors().link) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };

        match resolve_href(href, page_url) {
            Ok(Some(url)) if is_document_link(&url) => {
                let url = String::from(url);
                if !links.contains(&url) {
                    links.push(url);
                }
            }
            Ok(_) => {}
            Err(e) => tracing::debug!("Ignoring attachment href '{}': {}", href, e),
        }
    }

    links
}

/// Detects a next-page control on a listing page
///
/// True if the pagination block has a `rel="next"` anchor, or its last anchor
/// reads "Next" or a right-pointing glyph.
pub fn has_next_page(html: &str) -> bool {
    let document = Html::parse_document(html);
    let sel = selectors();

    if document.select(&sel.pagination_next).next().is_some() {
        return true;
    }

    document
        .select(&sel.pagination_link)
        .last()
        .map(|a| {
            let text = a.text().collect::<String>();
            NEXT_MARKERS.iter().any(|marker| text.contains(marker))
        })
        .unwrap_or(false)
}
