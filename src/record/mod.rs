//! Case record data model
//!
//! This module defines the record shape produced by the extractor and
//! consumed by every sink:
//! - [`CaseRecord`], one scraped listing row
//! - [`Category`] / [`CategoryType`], the listing categories
//! - [`FiscalYear`] / [`FiscalYearFilter`], the fiscal-year axis

mod category;
mod fiscal_year;

pub use category::{Category, CategoryType};
pub use fiscal_year::{default_fiscal_years, FiscalYear, FiscalYearFilter, CURRENT_LABEL};

use crate::normalize::{extract_amounts, CaseDate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One scraped listing row
///
/// Field names serialize in camelCase; together with the category names
/// they are the compatibility contract for downstream importers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseRecord {
    /// Last path segment of the detail URL, or a synthetic fallback
    pub id: String,

    pub category: Category,

    pub category_type: CategoryType,

    /// Fiscal-year label, `"current"` for non-fiscal-year crawls
    #[serde(default = "current_label")]
    pub fiscal_year: String,

    #[serde(default)]
    pub fiscal_year_gregorian: Option<String>,

    /// Best-effort date string; see `date_parsed`
    pub date: String,

    /// Whether `date` came from a recognised date pattern
    #[serde(default)]
    pub date_parsed: bool,

    pub title: String,

    pub accused_person: String,

    pub office: String,

    pub accusation: String,

    pub amount: String,

    pub detail_url: Option<String>,

    #[serde(default)]
    pub download_links: Vec<String>,

    pub scraped_at: DateTime<Utc>,

    /// Exact listing URL the record was extracted from
    pub source_url: String,
}

fn current_label() -> String {
    CURRENT_LABEL.to_string()
}

impl CaseRecord {
    /// Builds the fallback id for rows without a detail link
    ///
    /// `{category}_{fiscalYear}_{page}_{rowIndex}`, where the fiscal-year
    /// component is the query value or `current`. Category keys and
    /// fiscal-year values contain no underscores, so distinct tuples never
    /// collide.
    pub fn synthetic_id(
        category: Category,
        fiscal_year: &FiscalYearFilter,
        page: u32,
        row_index: usize,
    ) -> String {
        format!(
            "{}_{}_{}_{}",
            category.key(),
            fiscal_year.id_component(),
            page,
            row_index
        )
    }

    /// Returns the date as a tagged value
    pub fn case_date(&self) -> CaseDate {
        if self.date_parsed {
            CaseDate::Parsed(self.date.clone())
        } else {
            CaseDate::Raw(self.date.clone())
        }
    }

    /// Key used to suppress duplicates: the detail URL when present, else the id
    pub fn dedup_key(&self) -> &str {
        self.detail_url.as_deref().unwrap_or(&self.id)
    }

    /// Returns true if the amount column carried any text
    pub fn has_amount(&self) -> bool {
        !self.amount.trim().is_empty()
    }

    /// Returns every monetary observation embedded in the title
    pub fn title_amounts(&self) -> Vec<f64> {
        extract_amounts(&self.title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn sample_record() -> CaseRecord {
        CaseRecord {
            id: "1234".to_string(),
            category: Category::ChargeSheet,
            category_type: CategoryType::CourtFiling,
            fiscal_year: "2082/83".to_string(),
            fiscal_year_gregorian: Some("2025/26".to_string()),
            date: "2082/03/15".to_string(),
            date_parsed: true,
            title: "रू.१,०००।५० बिगो".to_string(),
            accused_person: "राम बहादुर".to_string(),
            office: "नापी कार्यालय".to_string(),
            accusation: "घुस".to_string(),
            amount: String::new(),
            detail_url: Some("https://ciaa.gov.np/pressrelease/1234".to_string()),
            download_links: vec![],
            scraped_at: Utc::now(),
            source_url: "https://ciaa.gov.np/pressreleaseCategory/charge?fiscal_year=12&page=1"
                .to_string(),
        }
    }

    #[test]
    fn test_synthetic_ids_are_collision_free() {
        let fy_a = FiscalYearFilter::Year(FiscalYear::new("2", "2072/73", "2015/16"));
        let fy_b = FiscalYearFilter::Year(FiscalYear::new("12", "2082/83", "2025/26"));
        let years = [FiscalYearFilter::Current, fy_a, fy_b];

        let mut seen = HashSet::new();
        for category in Category::ALL {
            for fy in &years {
                for page in 1..=12 {
                    for row in 0..12 {
                        let id = CaseRecord::synthetic_id(category, fy, page, row);
                        assert!(seen.insert(id.clone()), "collision on {id}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_synthetic_id_is_stable() {
        let make = || FiscalYearFilter::Year(FiscalYear::new("7", "2077/78", "2020/21"));
        let first = CaseRecord::synthetic_id(Category::Appeal, &make(), 3, 4);
        let second = CaseRecord::synthetic_id(Category::Appeal, &make(), 3, 4);
        assert_eq!(first, second);
        assert_eq!(first, "appeal_7_3_4");
    }

    #[test]
    fn test_dedup_key_prefers_detail_url() {
        let mut record = sample_record();
        assert_eq!(record.dedup_key(), "https://ciaa.gov.np/pressrelease/1234");
        record.detail_url = None;
        assert_eq!(record.dedup_key(), "1234");
    }

    #[test]
    fn test_json_field_names() {
        let value = serde_json::to_value(sample_record()).unwrap();
        assert_eq!(value["category"], "Charge Sheet");
        assert_eq!(value["categoryType"], "court_filing");
        assert_eq!(value["fiscalYearGregorian"], "2025/26");
        assert_eq!(value["accusedPerson"], "राम बहादुर");
        assert!(value.get("detailUrl").is_some());
        assert!(value.get("downloadLinks").is_some());
        assert!(value.get("sourceUrl").is_some());
    }

    #[test]
    fn test_deserialize_minimal_legacy_record() {
        let json = r#"{
            "id": "charge_1_0",
            "category": "Charge Sheet",
            "categoryType": "court_filing",
            "date": "2082-01-01",
            "title": "t",
            "accusedPerson": "",
            "office": "",
            "accusation": "",
            "amount": "",
            "detailUrl": null,
            "scrapedAt": "2025-07-01T00:00:00Z",
            "sourceUrl": "https://ciaa.gov.np/pressreleaseCategory/charge"
        }"#;
        let record: CaseRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.fiscal_year, "current");
        assert!(record.download_links.is_empty());
        assert!(!record.case_date().is_parsed());
    }

    #[test]
    fn test_title_amounts() {
        assert_eq!(sample_record().title_amounts(), vec![1000.5]);
    }
}
