use crate::record::{Category, FiscalYearFilter};
use url::Url;

/// Returns the listing URL of a category, without query parameters
pub fn category_url(base_url: &Url, category: Category) -> Result<Url, url::ParseError> {
    base_url.join(&category.listing_path())
}

/// Builds the URL of one listing page
///
/// # Query Rules
///
/// | Fiscal year | Page | Query |
/// |-------------|------|-------|
/// | Current | 1 | none (the site's canonical first page) |
/// | Current | n > 1 | `?page=n` |
/// | Year | any | `?fiscal_year=v&page=n` |
///
/// # Examples
///
/// ```
/// use ciaa_crawler::record::{Category, FiscalYear, FiscalYearFilter};
/// use ciaa_crawler::url::build_page_url;
/// use url::Url;
///
/// let base = Url::parse("https://ciaa.gov.np").unwrap();
/// let first = build_page_url(&base, Category::ChargeSheet, &FiscalYearFilter::Current, 1).unwrap();
/// assert_eq!(first.as_str(), "https://ciaa.gov.np/pressreleaseCategory/charge");
///
/// let fy = FiscalYearFilter::Year(FiscalYear::new("12", "2082/83", "2025/26"));
/// let url = build_page_url(&base, Category::Appeal, &fy, 2).unwrap();
/// assert_eq!(
///     url.as_str(),
///     "https://ciaa.gov.np/pressreleaseCategory/appeal?fiscal_year=12&page=2"
/// );
/// ```
pub fn build_page_url(
    base_url: &Url,
    category: Category,
    fiscal_year: &FiscalYearFilter,
    page: u32,
) -> Result<Url, url::ParseError> {
    let mut url = category_url(base_url, category)?;

    match fiscal_year.query_value() {
        Some(value) => {
            url.query_pairs_mut()
                .append_pair("fiscal_year", value)
                .append_pair("page", &page.to_string());
        }
        None if page > 1 => {
            url.query_pairs_mut().append_pair("page", &page.to_string());
        }
        None => {}
    }

    Ok(url)
}
