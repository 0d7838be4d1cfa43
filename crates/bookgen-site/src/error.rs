//! Error types for book building and site assembly.

use bookgen_notion::FetchError;
use bookgen_render::RenderError;
use bookgen_snippets::SnippetError;

/// Error from building a book or writing the site.
///
/// Everything here is fatal: the pipeline publishes a whole consistent site
/// or nothing. Recoverable conditions (unresolved embeds, broken links,
/// odd collection values) are warnings in the components, not errors.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Content-tree invariant violation: unknown meta key, missing sub-page
    /// target, wrong root block type.
    #[error("{0}")]
    Structural(String),

    /// Page fetch failure.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Snippet extraction, execution or cache failure.
    #[error(transparent)]
    Snippet(#[from] SnippetError),

    /// Renderer failure.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Worker pool construction failure.
    #[error("thread pool error")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// JSON serialization error.
    #[error("JSON error")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error")]
    Io(#[from] std::io::Error),
}
