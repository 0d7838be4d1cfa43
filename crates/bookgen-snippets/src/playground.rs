//! Playground share-id cache.
//!
//! "Try online" links need a share id from the playground service. Submitting
//! the same snippet always yields the same id, so ids are cached in an
//! append-only line file, one `{hash} {id}` pair per line, keyed by the
//! snippet's content hash.

use std::collections::HashMap;
use std::fs;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use ureq::Agent;

use crate::error::SnippetError;

/// Cache of snippet content hash to playground share id.
#[derive(Debug)]
pub struct PlaygroundCache {
    path: PathBuf,
    share_url: String,
    entries: HashMap<String, String>,
    agent: Agent,
}

impl PlaygroundCache {
    /// Load the cache file at `path`, which may not exist yet.
    ///
    /// `share_url` is the POST endpoint that returns a share id for a
    /// submitted snippet body.
    ///
    /// # Errors
    ///
    /// I/O failures and malformed cache lines.
    pub fn load(path: &Path, share_url: &str) -> Result<Self, SnippetError> {
        let mut entries = HashMap::new();
        if path.exists() {
            let data = fs::read_to_string(path)?;
            for line in data.lines() {
                if line.is_empty() {
                    continue;
                }
                let Some((hash, id)) = line.split_once(' ') else {
                    return Err(SnippetError::CorruptShard {
                        path: path.to_path_buf(),
                        reason: format!("bad share-id line '{line}'"),
                    });
                };
                entries.insert(hash.to_string(), id.to_string());
            }
        }
        debug!(path = %path.display(), entries = entries.len(), "loaded playground cache");
        Ok(Self {
            path: path.to_path_buf(),
            share_url: share_url.to_string(),
            entries,
            agent: Agent::new_with_defaults(),
        })
    }

    /// Cached share id for a content hash.
    #[must_use]
    pub fn get(&self, hash: &str) -> Option<&str> {
        self.entries.get(hash).map(String::as_str)
    }

    /// Share id for a snippet, submitting it to the service on a cache miss.
    ///
    /// Fresh ids are appended to the cache file immediately, so a run that
    /// fails later doesn't re-submit what it already shared.
    ///
    /// # Errors
    ///
    /// HTTP and I/O failures.
    pub fn get_or_submit(&mut self, hash: &str, code: &str) -> Result<String, SnippetError> {
        if let Some(id) = self.entries.get(hash) {
            return Ok(id.clone());
        }

        info!(hash, "submitting snippet to playground");
        let response = self
            .agent
            .post(&self.share_url)
            .header("Content-Type", "text/plain")
            .send(code.as_bytes())?;
        let id = response.into_body().read_to_string()?.trim().to_string();

        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(f, "{hash} {id}")?;
        self.entries.insert(hash.to_string(), id.clone());
        Ok(id)
    }
}
