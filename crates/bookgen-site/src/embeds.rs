//! Embed locator unwrapping.
//!
//! Embed blocks carry the URL of a widget service wrapping the real GitHub
//! file URL as a query parameter:
//!
//! ```text
//! https://www.onlinetool.io/gitoembed/widget?url=https%3A%2F%2Fgithub.com%2F...
//! ```
//!
//! The inner URL points into the books repository; stripping the repository
//! prefix, `blob/` and the branch segment leaves the file's path inside a
//! local checkout.

use tracing::warn;
use url::Url;

const WIDGET_HOSTS: &[&str] = &["onlinetool.io", "www.onlinetool.io"];
const WIDGET_PATH: &str = "/gitoembed/widget";
const REPO_PREFIX: &str = "https://github.com/essentialbooks/books/";
const BRANCH_SEGMENTS: &[&str] = &["master/", "notion/"];
const SANDBOX_HOSTS: &[&str] = &["repl.it", "www.repl.it", "replit.com", "www.replit.com"];

/// A successfully unwrapped embed locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedSource {
    /// File path relative to the books repository checkout.
    pub repo_path: String,
    /// Unwrapped GitHub URL, for "view on GitHub" links.
    pub github_url: String,
}

/// Unwrap an embed locator into a repository file reference.
///
/// Locators that don't match the expected widget or repository shape yield
/// `None` with a diagnostic; an unresolvable embed is skipped, not fatal.
#[must_use]
pub fn resolve_embed_source(embed_url: &str) -> Option<EmbedSource> {
    let github_url = unwrap_widget(embed_url)?;
    let Some(rest) = github_url.strip_prefix(REPO_PREFIX) else {
        warn!(url = %github_url, "embed points outside the books repository");
        return None;
    };
    let rest = rest.strip_prefix("blob/").unwrap_or(rest);
    let rest = BRANCH_SEGMENTS
        .iter()
        .find_map(|b| rest.strip_prefix(b))
        .unwrap_or(rest);
    if rest.is_empty() {
        warn!(url = %embed_url, "embed resolves to an empty path");
        return None;
    }
    Some(EmbedSource {
        repo_path: rest.to_string(),
        github_url,
    })
}

/// True for locators pointing at a hosted multi-file sandbox project,
/// downloadable as `{url}.zip`.
#[must_use]
pub fn is_sandbox_source(embed_url: &str) -> bool {
    Url::parse(embed_url)
        .is_ok_and(|u| u.host_str().is_some_and(|h| SANDBOX_HOSTS.contains(&h)))
}

/// Pull the inner URL out of the widget wrapper. Direct repository URLs
/// pass through unchanged.
fn unwrap_widget(embed_url: &str) -> Option<String> {
    if embed_url.starts_with(REPO_PREFIX) {
        return Some(embed_url.to_string());
    }
    let Ok(parsed) = Url::parse(embed_url) else {
        warn!(url = %embed_url, "unparsable embed locator");
        return None;
    };
    let host_matches = parsed
        .host_str()
        .is_some_and(|h| WIDGET_HOSTS.contains(&h));
    if !host_matches || parsed.path() != WIDGET_PATH {
        warn!(url = %embed_url, "embed locator is not a widget URL");
        return None;
    }
    let inner = parsed
        .query_pairs()
        .find(|(k, _)| k == "url")
        .map(|(_, v)| v.into_owned());
    if inner.is_none() {
        warn!(url = %embed_url, "widget URL without an url parameter");
    }
    inner
}
