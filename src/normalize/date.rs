use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

fn date_re() -> &'static Regex {
    static DATE_RE: OnceLock<Regex> = OnceLock::new();
    DATE_RE.get_or_init(|| {
        Regex::new(r"[0-9०-९]{4}[-/][0-9०-९]{2}[-/][0-9०-९]{2}").expect("valid date regex")
    })
}

/// A best-effort date extracted from a listing cell
///
/// The source publishes dates in the Nepali calendar and occasionally leaves
/// the cell free-form. Keeping the two outcomes apart lets downstream
/// consumers decide what to do with unparsed text instead of assuming every
/// `date` is a timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseDate {
    /// A `YYYY-MM-DD` / `YYYY/MM/DD` fragment was found
    Parsed(String),

    /// No date pattern matched; holds the trimmed raw cell text
    Raw(String),
}

impl CaseDate {
    /// Returns the date text regardless of variant
    pub fn as_str(&self) -> &str {
        match self {
            Self::Parsed(s) | Self::Raw(s) => s,
        }
    }

    /// Returns true if a date pattern was matched
    pub fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed(_))
    }

    pub fn into_string(self) -> String {
        match self {
            Self::Parsed(s) | Self::Raw(s) => s,
        }
    }
}

impl fmt::Display for CaseDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extracts the first date fragment from `text`, separators untouched
///
/// # Example
///
/// ```
/// use ciaa_crawler::normalize::{normalize_date, CaseDate};
///
/// assert_eq!(
///     normalize_date("मिति: 2082-03-15"),
///     CaseDate::Parsed("2082-03-15".to_string())
/// );
/// assert_eq!(normalize_date("  unknown "), CaseDate::Raw("unknown".to_string()));
/// ```
pub fn normalize_date(text: &str) -> CaseDate {
    match date_re().find(text) {
        Some(m) => CaseDate::Parsed(m.as_str().to_string()),
        None => CaseDate::Raw(text.trim().to_string()),
    }
}

/// Like [`normalize_date`], but rewrites matched separators to `/`
///
/// Used by fiscal-year crawls, whose output uses slash-separated dates.
pub fn normalize_date_slashed(text: &str) -> CaseDate {
    match normalize_date(text) {
        CaseDate::Parsed(s) => CaseDate::Parsed(s.replace('-', "/")),
        raw => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dash_date() {
        assert_eq!(
            normalize_date("2082-03-15"),
            CaseDate::Parsed("2082-03-15".to_string())
        );
    }

    #[test]
    fn test_slash_date_kept_as_is() {
        assert_eq!(
            normalize_date("2081/11/02 प्रकाशित"),
            CaseDate::Parsed("2081/11/02".to_string())
        );
    }

    #[test]
    fn test_native_digit_date() {
        let date = normalize_date("२०८२-०३-१५");
        assert!(date.is_parsed());
        assert_eq!(date.as_str(), "२०८२-०३-१५");
    }

    #[test]
    fn test_fallback_to_trimmed_raw_text() {
        let date = normalize_date("  असार १५  ");
        assert_eq!(date, CaseDate::Raw("असार १५".to_string()));
        assert!(!date.is_parsed());
    }

    #[test]
    fn test_slashed_variant() {
        assert_eq!(
            normalize_date_slashed("2082-03-15"),
            CaseDate::Parsed("2082/03/15".to_string())
        );
        assert_eq!(
            normalize_date_slashed("n/a"),
            CaseDate::Raw("n/a".to_string())
        );
    }

    #[test]
    fn test_partial_date_is_raw() {
        assert!(!normalize_date("2082-3-15").is_parsed());
    }
}
