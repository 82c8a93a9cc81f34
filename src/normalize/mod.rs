//! Numeral and date normalization
//!
//! Pure functions that turn locale-specific text fragments into canonical
//! values:
//! - Devanagari digit glyphs to ASCII digits
//! - Currency-prefixed amounts (with lakh-style grouping and the danda
//!   decimal glyph) to `f64`
//! - Date fragments to a best-effort [`CaseDate`]
//!
//! A failed match is never an error: amounts come back as `None` and dates
//! fall back to [`CaseDate::Raw`].

mod date;
mod numeral;

pub use date::{normalize_date, normalize_date_slashed, CaseDate};
pub use numeral::{
    extract_amounts, largest_amount, native_digit_value, normalize_amount, to_ascii_digits,
    DECIMAL_GLYPH,
};
