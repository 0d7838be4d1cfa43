//! CLI error types.

use bookgen_notion::FetchError;
use bookgen_site::BuildError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Build(#[from] BuildError),

    #[error("{0}")]
    Fetch(#[from] FetchError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Validation(String),
}
