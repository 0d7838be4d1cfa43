//! On-disk page cache and the cached page-graph loader.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::client::PageProvider;
use crate::error::FetchError;
use crate::types::{Document, normalize_id};

/// Fetch attempts per document before giving up.
const FETCH_ATTEMPTS: u32 = 3;
/// Pause between attempts.
const FETCH_BACKOFF: Duration = Duration::from_secs(3);

/// Cache of fetched documents, one `{normalized_id}.json` file per page.
#[derive(Debug)]
pub struct PageCache {
    dir: PathBuf,
    log_dir: Option<PathBuf>,
}

impl PageCache {
    /// Open a cache rooted at `dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// I/O failures creating the directory.
    pub fn new(dir: &Path) -> Result<Self, FetchError> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            log_dir: None,
        })
    }

    /// Also write a diagnostic copy of every stored document under `dir`.
    ///
    /// # Errors
    ///
    /// I/O failures creating the directory.
    pub fn with_log_dir(mut self, dir: &Path) -> Result<Self, FetchError> {
        fs::create_dir_all(dir)?;
        self.log_dir = Some(dir.to_path_buf());
        Ok(self)
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", normalize_id(id)))
    }

    /// Load a cached document. An unparsable cache file is treated as a
    /// miss (with a warning), not an error; the refetch will overwrite it.
    #[must_use]
    pub fn load(&self, id: &str) -> Option<Document> {
        let path = self.path_for(id);
        let data = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&data) {
            Ok(doc) => Some(doc),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "discarding unparsable cached page");
                None
            }
        }
    }

    /// Persist a fetched document.
    ///
    /// # Errors
    ///
    /// Serialization and I/O failures.
    pub fn store(&self, id: &str, doc: &Document) -> Result<(), FetchError> {
        let data = serde_json::to_string_pretty(doc)?;
        fs::write(self.path_for(id), &data)?;
        if let Some(log_dir) = &self.log_dir {
            fs::write(log_dir.join(format!("{}.json", normalize_id(id))), &data)?;
        }
        Ok(())
    }
}

/// Which pages may be served from the cache.
#[derive(Debug, Default, Clone)]
pub struct CachePolicy {
    /// When false, every page is refetched.
    pub use_cache: bool,
    /// Normalized ids to refetch even when the cache is enabled.
    pub refresh: HashSet<String>,
}

impl CachePolicy {
    /// Policy that serves everything possible from the cache.
    #[must_use]
    pub fn cached() -> Self {
        Self {
            use_cache: true,
            refresh: HashSet::new(),
        }
    }

    fn use_cache_for(&self, id: &str) -> bool {
        self.use_cache && !self.refresh.contains(&normalize_id(id))
    }
}

/// Fetch one page, consulting the cache per `policy`.
///
/// On a miss the provider is tried up to 3 times with a 3-second pause.
/// A fetched document is persisted before it is returned, so only a crash
/// between fetch and store forces a refetch.
///
/// # Errors
///
/// [`FetchError::RetriesExhausted`] once all attempts fail; storage errors.
pub fn fetch_page(
    provider: &dyn PageProvider,
    cache: &PageCache,
    id: &str,
    policy: &CachePolicy,
) -> Result<Document, FetchError> {
    fetch_page_with(provider, cache, id, policy, FETCH_ATTEMPTS, FETCH_BACKOFF)
}

fn fetch_page_with(
    provider: &dyn PageProvider,
    cache: &PageCache,
    id: &str,
    policy: &CachePolicy,
    attempts: u32,
    backoff: Duration,
) -> Result<Document, FetchError> {
    if policy.use_cache_for(id)
        && let Some(doc) = cache.load(id)
    {
        debug!(id, "using cached page");
        return Ok(doc);
    }

    let mut attempt = 0;
    let source = loop {
        attempt += 1;
        match provider.fetch_document(id) {
            Ok(doc) => {
                cache.store(id, &doc)?;
                info!(id, "fetched page");
                return Ok(doc);
            }
            Err(e) if attempt < attempts => {
                warn!(id, attempt, error = %e, "fetch failed, retrying");
                thread::sleep(backoff);
            }
            Err(e) => break e,
        }
    };
    Err(FetchError::RetriesExhausted {
        id: normalize_id(id),
        attempts,
        source: Box::new(source),
    })
}

/// Load a page and everything reachable from it through sub-page blocks.
///
/// Breadth-first over sub-page references with a visited set, so shared or
/// cyclic references fetch each page once. Keys are normalized ids.
///
/// # Errors
///
/// Any page fetch failing is fatal for the whole graph.
pub fn load_page_graph(
    provider: &dyn PageProvider,
    cache: &PageCache,
    root_id: &str,
    policy: &CachePolicy,
) -> Result<HashMap<String, Document>, FetchError> {
    let mut docs = HashMap::new();
    let mut queue = VecDeque::from([normalize_id(root_id)]);
    let mut seen: HashSet<String> = queue.iter().cloned().collect();

    while let Some(id) = queue.pop_front() {
        let doc = fetch_page(provider, cache, &id, policy)?;
        for sub_id in doc.sub_page_ids() {
            if seen.insert(sub_id.clone()) {
                queue.push_back(sub_id);
            }
        }
        docs.insert(id, doc);
    }
    info!(root = root_id, pages = docs.len(), "loaded page graph");
    Ok(docs)
}
