//! TOC / search index generation.
//!
//! Each book ships a JS file with one flat array per page:
//! `[url, title, search terms..., heading texts...]`, consumed by the
//! client-side search box.

use bookgen_render::HeadingInfo;
use serde_json::json;

use crate::book::Book;
use crate::error::BuildError;

/// Build the search index for a book.
///
/// `headings` holds the per-page heading lists from rendering, indexed like
/// the tree's arena (reading order).
///
/// # Errors
///
/// JSON serialization failure.
pub fn toc_js(book: &Book, headings: &[Vec<HeadingInfo>]) -> Result<String, BuildError> {
    let mut entries = Vec::with_capacity(book.tree.nodes.len());
    for (i, page) in book.tree.nodes.iter().enumerate() {
        let mut entry = vec![book.url_of(i), page.title.clone()];
        entry.extend(page.search.iter().cloned());
        if let Some(page_headings) = headings.get(i) {
            entry.extend(page_headings.iter().map(|h| h.text.clone()));
        }
        entries.push(entry);
    }
    let data = serde_json::to_string(&json!(entries))?;
    Ok(format!("window.gBookToc = {data};\n"))
}
