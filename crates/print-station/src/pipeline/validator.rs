//! Structural checks for candidate printable documents.

use std::path::Path;

use lopdf::Document;

/// Whether `path` parses as a PDF whose first page (if any) is retrievable.
///
/// Returns `false` rather than an error on structural problems; the caller
/// decides how to surface them. A zero-page document passes here and is
/// rejected by the page-count gate instead.
pub fn validate(path: &Path) -> bool {
    let document = match Document::load(path) {
        Ok(document) => document,
        Err(_) => return false,
    };

    match document.get_pages().values().next() {
        Some(page_id) => document
            .get_object(*page_id)
            .and_then(|object| object.as_dict())
            .is_ok(),
        None => true,
    }
}

/// Number of pages in the document at `path`.
pub fn count_pages(path: &Path) -> Result<u32, ValidationError> {
    let document = Document::load(path).map_err(|source| ValidationError::Unreadable { source })?;
    Ok(document.get_pages().len() as u32)
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid PDF file: {source}")]
    Unreadable { source: lopdf::Error },
}
