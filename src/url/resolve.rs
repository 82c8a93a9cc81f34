use url::Url;

/// File extensions treated as downloadable case documents
pub const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "doc", "docx"];

/// Resolves an `href` against the page it was found on
///
/// Returns `Ok(None)` for links that never point at a record:
/// - empty hrefs and fragment-only anchors
/// - `javascript:`, `mailto:`, `tel:` and `data:` schemes
/// - anything that resolves to a non-HTTP(S) URL
///
/// Returns `Err` when the href cannot be parsed at all.
pub fn resolve_href(href: &str, base_url: &Url) -> Result<Option<Url>, url::ParseError> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return Ok(None);
    }

    let lowered = href.to_ascii_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return Ok(None);
    }

    let resolved = base_url.join(href)?;
    if resolved.scheme() == "http" || resolved.scheme() == "https" {
        Ok(Some(resolved))
    } else {
        Ok(None)
    }
}

/// Returns the last non-empty path segment, used as the natural record id
pub fn last_path_segment(url: &Url) -> Option<String> {
    url.path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .map(str::to_string)
}

/// Returns true if the URL path ends in a document extension
///
/// Query strings and fragments are ignored; the comparison is case-insensitive.
pub fn is_document_link(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    DOCUMENT_EXTENSIONS
        .iter()
        .any(|ext| path.ends_with(&format!(".{}", ext)))
}
