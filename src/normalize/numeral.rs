use regex::Regex;
use std::sync::OnceLock;

/// First code point of the Devanagari digit block (`०`)
const DEVANAGARI_ZERO: u32 = 0x0966;

/// The danda, used by the source as a decimal separator inside amounts
pub const DECIMAL_GLYPH: char = '।';

fn prefixed_amount_re() -> &'static Regex {
    static PREFIXED_AMOUNT_RE: OnceLock<Regex> = OnceLock::new();
    PREFIXED_AMOUNT_RE.get_or_init(|| {
        Regex::new(r"(?:रू\.?|रु\.?|र\.|N?Rs\.?)\s*([0-9०-९][0-9०-९,]*(?:[।.][0-9०-९]+)?)")
            .expect("valid prefixed amount regex")
    })
}

fn bare_amount_re() -> &'static Regex {
    static BARE_AMOUNT_RE: OnceLock<Regex> = OnceLock::new();
    BARE_AMOUNT_RE.get_or_init(|| {
        Regex::new(r"^([0-9०-९][0-9०-९,]*(?:[।.][0-9०-९]+)?)$").expect("valid bare amount regex")
    })
}

/// Returns the numeric value of a Devanagari digit glyph
pub fn native_digit_value(c: char) -> Option<u32> {
    let offset = (c as u32).checked_sub(DEVANAGARI_ZERO)?;
    (offset < 10).then_some(offset)
}

/// Replaces every Devanagari digit with its ASCII equivalent
///
/// Other characters pass through untouched.
pub fn to_ascii_digits(text: &str) -> String {
    text.chars()
        .map(|c| match native_digit_value(c) {
            Some(d) => char::from_digit(d, 10).unwrap_or(c),
            None => c,
        })
        .collect()
}

/// Converts one matched numeric fragment into a positive amount
fn parse_fragment(fragment: &str) -> Option<f64> {
    let canonical: String = to_ascii_digits(fragment)
        .chars()
        .filter(|c| *c != ',')
        .map(|c| if c == DECIMAL_GLYPH { '.' } else { c })
        .collect();

    canonical
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value > 0.0)
}

/// Extracts every currency-prefixed amount in `text`, in order of appearance
///
/// Titles frequently carry several amounts; the analysis path keeps each
/// one as a separate observation.
pub fn extract_amounts(text: &str) -> Vec<f64> {
    prefixed_amount_re()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| parse_fragment(m.as_str()))
        .collect()
}

/// Normalizes the first amount found in `text`
///
/// Looks for a currency-prefixed amount first. If there is none, the whole
/// trimmed text is accepted when it is itself a bare number, which makes the
/// function idempotent on its own formatted output.
///
/// Returns `None` when nothing matches or the value is zero, negative or NaN.
///
/// # Example
///
/// ```
/// use ciaa_crawler::normalize::normalize_amount;
///
/// assert_eq!(normalize_amount("रू.१,२५,६६,५५५।५०"), Some(12566555.50));
/// assert_eq!(normalize_amount("12566555.5"), Some(12566555.5));
/// assert_eq!(normalize_amount("no amount here"), None);
/// ```
pub fn normalize_amount(text: &str) -> Option<f64> {
    if let Some(first) = extract_amounts(text).into_iter().next() {
        return Some(first);
    }

    bare_amount_re()
        .captures(text.trim())
        .and_then(|caps| caps.get(1))
        .and_then(|m| parse_fragment(m.as_str()))
}

/// Returns the largest currency-prefixed amount in `text`
pub fn largest_amount(text: &str) -> Option<f64> {
    extract_amounts(text).into_iter().reduce(f64::max)
}
