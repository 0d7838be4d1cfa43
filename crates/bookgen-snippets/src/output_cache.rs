//! Content-addressed, sharded store for captured snippet output.
//!
//! Executed snippet output is keyed by the SHA-256 of the snippet's filtered
//! content and persisted as a set of shard files under the cache directory,
//! `cached_output_1.txt`, `cached_output_2.txt`, ... Each shard is a sequence
//! of length-prefixed records:
//!
//! ```text
//! {hash}:{value_len}\n{value_bytes}\n
//! ```
//!
//! Shards are bounded so diffs stay reviewable when the cache lives in a git
//! repository. Records are held in memory between [`OutputStore::load`] and
//! [`OutputStore::flush`]; flush rewrites all shards with records sorted by
//! hash, so two runs over the same content produce byte-identical files.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::SnippetError;

/// Combined key + value byte budget per shard.
pub const MAX_SHARD_SIZE: usize = 1024 * 128;

const SHARD_PREFIX: &str = "cached_output_";
const SHARD_SUFFIX: &str = ".txt";

/// Hex SHA-256 of a snippet's filtered content, the store's key.
#[must_use]
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// In-memory view of the sharded output cache.
#[derive(Debug)]
pub struct OutputStore {
    dir: PathBuf,
    // BTreeMap keeps flush output sorted without a separate sort pass
    entries: BTreeMap<String, String>,
}

impl OutputStore {
    /// Load all shard files under `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// I/O failures and shard files that don't parse.
    pub fn load(dir: &Path) -> Result<Self, SnippetError> {
        fs::create_dir_all(dir)?;
        let mut entries = BTreeMap::new();
        for path in shard_paths(dir)? {
            parse_shard(&path, &mut entries)?;
        }
        debug!(
            dir = %dir.display(),
            entries = entries.len(),
            "loaded output cache"
        );
        Ok(Self {
            dir: dir.to_path_buf(),
            entries,
        })
    }

    /// Delete all shard files and start from an empty store.
    ///
    /// # Errors
    ///
    /// I/O failures while listing or removing shard files.
    pub fn recreate(dir: &Path) -> Result<Self, SnippetError> {
        fs::create_dir_all(dir)?;
        for path in shard_paths(dir)? {
            fs::remove_file(&path)?;
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            entries: BTreeMap::new(),
        })
    }

    /// Cached output for a content hash.
    #[must_use]
    pub fn get(&self, hash: &str) -> Option<&str> {
        self.entries.get(hash).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record output for a hash. In-memory until [`flush`](Self::flush).
    pub fn record(&mut self, hash: &str, value: &str) {
        if record_size(hash, value) > MAX_SHARD_SIZE {
            warn!(hash, len = value.len(), "output larger than the shard budget");
        }
        self.entries.insert(hash.to_string(), value.to_string());
    }

    /// Rewrite all shard files from the in-memory entries.
    ///
    /// Records go out sorted by hash and are packed greedily: a record that
    /// would push the current shard past [`MAX_SHARD_SIZE`] starts the next
    /// shard. A record larger than the budget on its own gets a shard to
    /// itself. Stale higher-numbered shards from a previous, larger cache
    /// are removed. The written files are reloaded as a round-trip check.
    ///
    /// # Errors
    ///
    /// I/O failures, or a reload that doesn't match what was written.
    pub fn flush(&mut self) -> Result<(), SnippetError> {
        let mut shard_no = 0u32;
        let mut buf = String::new();
        let mut size = 0usize;

        for (hash, value) in &self.entries {
            let rec = record_size(hash, value);
            if size + rec > MAX_SHARD_SIZE && size > 0 {
                shard_no += 1;
                fs::write(shard_path(&self.dir, shard_no), &buf)?;
                buf.clear();
                size = 0;
            }
            buf.push_str(hash);
            buf.push(':');
            buf.push_str(&value.len().to_string());
            buf.push('\n');
            buf.push_str(value);
            buf.push('\n');
            size += rec;
        }
        if !buf.is_empty() {
            shard_no += 1;
            fs::write(shard_path(&self.dir, shard_no), &buf)?;
        }

        for path in shard_paths(&self.dir)? {
            if shard_number(&path).is_some_and(|n| n > shard_no) {
                fs::remove_file(&path)?;
            }
        }

        let reloaded = Self::load(&self.dir)?;
        if reloaded.entries != self.entries {
            return Err(SnippetError::CorruptShard {
                path: self.dir.clone(),
                reason: "flushed shards don't round-trip".to_string(),
            });
        }
        debug!(entries = self.entries.len(), shards = shard_no, "flushed output cache");
        Ok(())
    }
}

fn record_size(hash: &str, value: &str) -> usize {
    hash.len() + value.len()
}

fn shard_path(dir: &Path, no: u32) -> PathBuf {
    dir.join(format!("{SHARD_PREFIX}{no}{SHARD_SUFFIX}"))
}

fn shard_number(path: &Path) -> Option<u32> {
    let name = path.file_name()?.to_str()?;
    name.strip_prefix(SHARD_PREFIX)?
        .strip_suffix(SHARD_SUFFIX)?
        .parse()
        .ok()
}

/// Existing shard files in shard-number order.
fn shard_paths(dir: &Path) -> Result<Vec<PathBuf>, SnippetError> {
    let mut numbered: Vec<(u32, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if let Some(no) = shard_number(&path) {
            numbered.push((no, path));
        }
    }
    numbered.sort_by_key(|(no, _)| *no);
    Ok(numbered.into_iter().map(|(_, p)| p).collect())
}

fn corrupt(path: &Path, reason: impl Into<String>) -> SnippetError {
    SnippetError::CorruptShard {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn parse_shard(path: &Path, entries: &mut BTreeMap<String, String>) -> Result<(), SnippetError> {
    let data = fs::read_to_string(path)?;
    let mut rest = data.as_str();
    while !rest.is_empty() {
        let Some((hash, after_hash)) = rest.split_once(':') else {
            return Err(corrupt(path, "record header missing ':'"));
        };
        if hash.len() != 64 || !hash.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(corrupt(path, format!("bad hash '{hash}'")));
        }
        let Some((len_str, after_len)) = after_hash.split_once('\n') else {
            return Err(corrupt(path, "record header missing newline"));
        };
        let len: usize = len_str
            .parse()
            .map_err(|_| corrupt(path, format!("bad value length '{len_str}'")))?;
        if after_len.len() < len + 1 || !after_len.is_char_boundary(len) {
            return Err(corrupt(path, "truncated record value"));
        }
        let (value, after_value) = after_len.split_at(len);
        let Some(tail) = after_value.strip_prefix('\n') else {
            return Err(corrupt(path, "record value missing trailing newline"));
        };
        entries.insert(hash.to_string(), value.to_string());
        rest = tail;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_content_hash_shape() {
        let h = content_hash("hello");
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(h, content_hash("hello"));
        assert_ne!(h, content_hash("hello\n"));
    }

    #[test]
    fn test_record_get_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut store = OutputStore::load(dir.path()).unwrap();
        let h = content_hash("code");
        assert_eq!(store.get(&h), None);
        store.record(&h, "out\nput");
        assert_eq!(store.get(&h), Some("out\nput"));
    }

    #[test]
    fn test_flush_then_load() {
        let dir = TempDir::new().unwrap();
        let mut store = OutputStore::load(dir.path()).unwrap();
        let h1 = content_hash("a");
        let h2 = content_hash("b");
        store.record(&h1, "output a");
        store.record(&h2, "multi\nline\n");
        store.flush().unwrap();

        let reloaded = OutputStore::load(dir.path()).unwrap();
        assert_eq!(reloaded.get(&h1), Some("output a"));
        assert_eq!(reloaded.get(&h2), Some("multi\nline\n"));
        assert_eq!(reloaded.len(), 2);
    }

    #[test]
    fn test_flush_is_deterministic() {
        let dir_a = TempDir::new().unwrap();
        let dir_b = TempDir::new().unwrap();
        let mut a = OutputStore::load(dir_a.path()).unwrap();
        let mut b = OutputStore::load(dir_b.path()).unwrap();
        // insertion order differs, files must not
        for (h, v) in [("x", "1"), ("y", "2"), ("z", "3")] {
            a.record(&content_hash(h), v);
        }
        for (h, v) in [("z", "3"), ("x", "1"), ("y", "2")] {
            b.record(&content_hash(h), v);
        }
        a.flush().unwrap();
        b.flush().unwrap();
        let file_a = fs::read_to_string(dir_a.path().join("cached_output_1.txt")).unwrap();
        let file_b = fs::read_to_string(dir_b.path().join("cached_output_1.txt")).unwrap();
        assert_eq!(file_a, file_b);
    }

    #[test]
    fn test_overflow_starts_new_shard() {
        let dir = TempDir::new().unwrap();
        let mut store = OutputStore::load(dir.path()).unwrap();
        // three records of ~half the shard budget: two shards expected
        let big = "x".repeat(MAX_SHARD_SIZE / 2);
        for i in 0..3 {
            store.record(&content_hash(&format!("snippet {i}")), &big);
        }
        store.flush().unwrap();
        assert!(dir.path().join("cached_output_1.txt").exists());
        assert!(dir.path().join("cached_output_2.txt").exists());
        assert!(!dir.path().join("cached_output_3.txt").exists());

        let reloaded = OutputStore::load(dir.path()).unwrap();
        assert_eq!(reloaded.len(), 3);
    }

    #[test]
    fn test_oversized_record_gets_own_shard() {
        let dir = TempDir::new().unwrap();
        let mut store = OutputStore::load(dir.path()).unwrap();
        let huge = "x".repeat(MAX_SHARD_SIZE + 1);
        let h = content_hash("huge");
        store.record(&content_hash("small"), "1");
        store.record(&h, &huge);
        store.flush().unwrap();
        assert!(dir.path().join("cached_output_2.txt").exists());

        let reloaded = OutputStore::load(dir.path()).unwrap();
        assert_eq!(reloaded.get(&h).map(str::len), Some(huge.len()));
    }

    #[test]
    fn test_flush_removes_stale_shards() {
        let dir = TempDir::new().unwrap();
        let mut store = OutputStore::load(dir.path()).unwrap();
        let big = "x".repeat(MAX_SHARD_SIZE / 2);
        for i in 0..3 {
            store.record(&content_hash(&format!("snippet {i}")), &big);
        }
        store.flush().unwrap();
        assert!(dir.path().join("cached_output_2.txt").exists());

        // shrink to a single small entry: shard 2 must go away
        let mut store = OutputStore::recreate(dir.path()).unwrap();
        store.record(&content_hash("only"), "small");
        store.flush().unwrap();
        assert!(dir.path().join("cached_output_1.txt").exists());
        assert!(!dir.path().join("cached_output_2.txt").exists());
    }

    #[test]
    fn test_recreate_empties_store() {
        let dir = TempDir::new().unwrap();
        let mut store = OutputStore::load(dir.path()).unwrap();
        store.record(&content_hash("a"), "1");
        store.flush().unwrap();

        let store = OutputStore::recreate(dir.path()).unwrap();
        assert!(store.is_empty());
        assert!(!dir.path().join("cached_output_1.txt").exists());
    }

    #[test]
    fn test_value_with_colons_and_newlines_roundtrips() {
        let dir = TempDir::new().unwrap();
        let mut store = OutputStore::load(dir.path()).unwrap();
        let h = content_hash("tricky");
        let value = "a:b\nc:d\n\n:e";
        store.record(&h, value);
        store.flush().unwrap();
        let reloaded = OutputStore::load(dir.path()).unwrap();
        assert_eq!(reloaded.get(&h), Some(value));
    }

    #[test]
    fn test_corrupt_shard_is_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("cached_output_1.txt"), "not a record").unwrap();
        let err = OutputStore::load(dir.path()).unwrap_err();
        assert!(matches!(err, SnippetError::CorruptShard { .. }));
    }

    #[test]
    fn test_truncated_record_is_error() {
        let dir = TempDir::new().unwrap();
        let h = content_hash("a");
        fs::write(
            dir.path().join("cached_output_1.txt"),
            format!("{h}:100\nshort\n"),
        )
        .unwrap();
        let err = OutputStore::load(dir.path()).unwrap_err();
        assert!(matches!(err, SnippetError::CorruptShard { .. }));
    }
}
