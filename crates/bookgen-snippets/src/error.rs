//! Error types for snippet processing.

use std::path::PathBuf;

/// Error from snippet extraction, execution or output caching.
#[derive(Debug, thiserror::Error)]
pub enum SnippetError {
    /// Snippet annotation grammar violation (directive or show markers).
    ///
    /// Always fatal for the whole run: a malformed annotation is an
    /// authoring bug that must be fixed before rebuilding.
    #[error("{path}: {reason}")]
    Parse {
        /// File the annotation came from.
        path: PathBuf,
        /// Human-readable description of the violation.
        reason: String,
    },

    /// Snippet subprocess exited non-zero and the file's directive does not
    /// carry `allow error`.
    #[error("executing '{path}' failed:\n{output}")]
    Execution {
        /// File that was executed.
        path: PathBuf,
        /// Combined stdout + stderr of the failed run.
        output: String,
    },

    /// A file extension with no known way to execute it.
    #[error("don't know how to execute '{path}' (extension '{ext}')")]
    UnsupportedExtension {
        /// File that was about to be executed.
        path: PathBuf,
        /// Lowercased extension.
        ext: String,
    },

    /// On-disk cache file (output shard or record file) that doesn't parse.
    #[error("corrupt cache file '{path}': {reason}")]
    CorruptShard {
        /// Cache file path.
        path: PathBuf,
        /// What went wrong while parsing.
        reason: String,
    },

    /// HTTP failure talking to the playground or sandbox service.
    #[error("HTTP request failed")]
    Http(#[from] Box<ureq::Error>),

    /// Sandbox archive that doesn't unpack.
    #[error("sandbox archive error")]
    Archive(#[from] zip::result::ZipError),

    /// I/O error.
    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

impl SnippetError {
    pub(crate) fn parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<ureq::Error> for SnippetError {
    fn from(e: ureq::Error) -> Self {
        Self::Http(Box::new(e))
    }
}
