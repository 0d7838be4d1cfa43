//! Error types for content fetching.

/// Error from content-provider operations.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// HTTP request failed (network error, timeout, etc).
    #[error("HTTP request failed")]
    HttpRequest(#[from] ureq::Error),

    /// HTTP response error (provider returned error status).
    #[error("HTTP error {status} fetching document '{id}'")]
    HttpResponse {
        /// Document id that was requested.
        id: String,
        /// HTTP status code.
        status: u16,
    },

    /// All fetch attempts for a document failed.
    #[error("fetching document '{id}' failed after {attempts} attempts")]
    RetriesExhausted {
        /// Document id that was requested.
        id: String,
        /// Number of attempts made.
        attempts: u32,
        /// Error from the last attempt.
        #[source]
        source: Box<FetchError>,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error")]
    Io(#[from] std::io::Error),
}
