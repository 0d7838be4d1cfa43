//! URL slugs and internal-link id extraction.

use bookgen_notion::{is_valid_page_id, normalize_id};

/// Host prefixes that mark a link as internal.
const INTERNAL_PREFIXES: &[&str] = &["https://www.notion.so/", "https://notion.so/"];

/// Maximum slug length in bytes.
const MAX_SLUG_LEN: usize = 128;

/// Turn a page title into a URL slug.
///
/// Lowercases, keeps `[a-z0-9-_.]`, maps everything else to `-`, collapses
/// repeated non-alphanumeric characters and trims `-` from the ends.
#[must_use]
pub fn urlify(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for c in title.chars() {
        let c = c.to_ascii_lowercase();
        let mapped = if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
            c
        } else {
            '-'
        };
        if !mapped.is_ascii_alphanumeric() && out.ends_with(mapped) {
            continue;
        }
        out.push(mapped);
    }
    // pure ASCII by construction, truncation can't split a character
    out.truncate(MAX_SLUG_LEN);
    out.trim_matches('-').to_string()
}

/// Extract a page id from an internal link URL.
///
/// Internal links look like `{prefix}{Readable-Slug-}{32 hex chars}` with an
/// optional query string. The trailing segment must pass strict 32-hex
/// validation; anything less falls through to `None` and the link stays
/// external.
#[must_use]
pub fn extract_page_id(url: &str) -> Option<String> {
    let rest = INTERNAL_PREFIXES
        .iter()
        .find_map(|p| url.strip_prefix(p))?;
    let rest = rest.split(['?', '#']).next()?;
    let tail = rest.rsplit(['-', '/']).next()?;
    let id = normalize_id(tail);
    is_valid_page_id(&id).then_some(id)
}
