//! HTTP page provider.

use std::time::Duration;

use tracing::debug;
use ureq::Agent;

use crate::error::FetchError;
use crate::types::{Document, normalize_id};

/// Default HTTP timeout in seconds.
const DEFAULT_TIMEOUT: u64 = 30;

/// Source of page documents, keyed by page id.
///
/// The HTTP implementation talks to the real service; tests substitute
/// in-memory providers.
pub trait PageProvider {
    /// Fetch a single page document.
    ///
    /// # Errors
    ///
    /// Network, status and decode failures. Retrying is the caller's job.
    fn fetch_document(&self, id: &str) -> Result<Document, FetchError>;
}

/// Page provider backed by the content service's REST API.
pub struct HttpPageProvider {
    agent: Agent,
    base_url: String,
}

impl HttpPageProvider {
    /// Create a provider for a service base URL.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT)))
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }
}

impl PageProvider for HttpPageProvider {
    fn fetch_document(&self, id: &str) -> Result<Document, FetchError> {
        let id = normalize_id(id);
        let url = format!("{}/api/v1/document/{id}", self.base_url);
        debug!(%url, "fetching document");
        let response = self.agent.get(&url).call()?;
        let status = response.status().as_u16();
        if status != 200 {
            return Err(FetchError::HttpResponse { id, status });
        }
        Ok(response.into_body().read_json()?)
    }
}
