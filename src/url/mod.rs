//! URL handling for the listing crawl
//!
//! This module provides page URL construction for the
//! `category x fiscal-year x page` traversal and resolution of the links
//! found inside listing rows.

mod page;
mod resolve;

pub use page::{build_page_url, category_url};
pub use resolve::{is_document_link, last_path_segment, resolve_href, DOCUMENT_EXTENSIONS};
