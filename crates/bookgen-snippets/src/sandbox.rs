//! Sandbox (multi-file snippet) download cache.
//!
//! Some embeds point at an external sandbox service instead of a single
//! repository file. The service exposes each sandbox as a zip archive at
//! `{url}.zip`. Downloads are cached in an append-only JSON-lines record
//! file keyed by sandbox URL; on reload the last record per URL wins, so a
//! refresh can append a new snapshot without rewriting history.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::fs::OpenOptions;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use ureq::Agent;

use crate::error::SnippetError;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Serialize, Deserialize)]
struct SandboxRecord {
    url: String,
    // BTreeMap keeps serialized records stable across runs
    files: BTreeMap<String, String>,
}

/// Cache of sandbox URL to unpacked file contents.
#[derive(Debug)]
pub struct SandboxCache {
    path: PathBuf,
    entries: HashMap<String, BTreeMap<String, String>>,
    agent: Agent,
}

impl SandboxCache {
    /// Load the record file at `path`, which may not exist yet.
    ///
    /// # Errors
    ///
    /// I/O failures and record lines that don't parse.
    pub fn load(path: &Path) -> Result<Self, SnippetError> {
        let mut entries = HashMap::new();
        if path.exists() {
            let data = fs::read_to_string(path)?;
            for line in data.lines() {
                if line.is_empty() {
                    continue;
                }
                let rec: SandboxRecord =
                    serde_json::from_str(line).map_err(|e| SnippetError::CorruptShard {
                        path: path.to_path_buf(),
                        reason: format!("bad sandbox record: {e}"),
                    })?;
                entries.insert(rec.url, rec.files);
            }
        }
        debug!(path = %path.display(), entries = entries.len(), "loaded sandbox cache");
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(DOWNLOAD_TIMEOUT))
            .build()
            .into();
        Ok(Self {
            path: path.to_path_buf(),
            entries,
            agent,
        })
    }

    /// Cached files for a sandbox URL.
    #[must_use]
    pub fn get(&self, url: &str) -> Option<&BTreeMap<String, String>> {
        self.entries.get(url)
    }

    /// Files for a sandbox, downloading and recording on a cache miss.
    ///
    /// # Errors
    ///
    /// HTTP, archive and I/O failures.
    pub fn get_or_fetch(
        &mut self,
        url: &str,
    ) -> Result<&BTreeMap<String, String>, SnippetError> {
        if !self.entries.contains_key(url) {
            let files = self.download(url)?;
            self.append(url, &files)?;
            self.entries.insert(url.to_string(), files);
        }
        Ok(&self.entries[url])
    }

    /// Re-download a sandbox and record it only if its content changed.
    ///
    /// Returns `true` when the content differed from the cached snapshot.
    ///
    /// # Errors
    ///
    /// HTTP, archive and I/O failures.
    pub fn refresh(&mut self, url: &str) -> Result<bool, SnippetError> {
        let files = self.download(url)?;
        if self.entries.get(url) == Some(&files) {
            debug!(url, "sandbox unchanged");
            return Ok(false);
        }
        self.append(url, &files)?;
        self.entries.insert(url.to_string(), files);
        Ok(true)
    }

    fn download(&self, url: &str) -> Result<BTreeMap<String, String>, SnippetError> {
        let archive_url = format!("{url}.zip");
        info!(url = %archive_url, "downloading sandbox archive");
        let response = self.agent.get(&archive_url).call()?;
        let bytes = response.into_body().read_to_vec()?;
        unpack_archive(&bytes)
    }

    fn append(&self, url: &str, files: &BTreeMap<String, String>) -> Result<(), SnippetError> {
        let rec = SandboxRecord {
            url: url.to_string(),
            files: files.clone(),
        };
        let line = serde_json::to_string(&rec).map_err(|e| SnippetError::CorruptShard {
            path: self.path.clone(),
            reason: format!("unserializable sandbox record: {e}"),
        })?;
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(f, "{line}")?;
        Ok(())
    }
}

/// Unpack a zip archive into name → text content, skipping directories.
fn unpack_archive(bytes: &[u8]) -> Result<BTreeMap<String, String>, SnippetError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut files = BTreeMap::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let mut buf = Vec::new();
        entry.read_to_end(&mut buf)?;
        let content = String::from_utf8_lossy(&buf).replace("\r\n", "\n");
        files.insert(entry.name().to_string(), content);
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn make_zip(files: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in files {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_unpack_archive() {
        let bytes = make_zip(&[("main.go", "package main\n"), ("go.mod", "module x\n")]);
        let files = unpack_archive(&bytes).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files["main.go"], "package main\n");
        assert_eq!(files["go.mod"], "module x\n");
    }

    #[test]
    fn test_unpack_normalizes_line_endings() {
        let bytes = make_zip(&[("a.txt", "one\r\ntwo\r\n")]);
        let files = unpack_archive(&bytes).unwrap();
        assert_eq!(files["a.txt"], "one\ntwo\n");
    }

    #[test]
    fn test_unpack_garbage_is_error() {
        assert!(matches!(
            unpack_archive(b"not a zip"),
            Err(SnippetError::Archive(_))
        ));
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let cache = SandboxCache::load(&dir.path().join("sandboxes.jsonl")).unwrap();
        assert_eq!(cache.get("https://sandbox/x"), None);
    }

    #[test]
    fn test_records_roundtrip_last_wins() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sandboxes.jsonl");
        let cache = SandboxCache::load(&path).unwrap();
        let mut v1 = BTreeMap::new();
        v1.insert("main.go".to_string(), "old".to_string());
        cache.append("https://sandbox/x", &v1).unwrap();
        let mut v2 = BTreeMap::new();
        v2.insert("main.go".to_string(), "new".to_string());
        cache.append("https://sandbox/x", &v2).unwrap();

        let reloaded = SandboxCache::load(&path).unwrap();
        assert_eq!(reloaded.get("https://sandbox/x"), Some(&v2));
    }

    #[test]
    fn test_corrupt_record_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sandboxes.jsonl");
        fs::write(&path, "{not json\n").unwrap();
        assert!(matches!(
            SandboxCache::load(&path),
            Err(SnippetError::CorruptShard { .. })
        ));
    }
}
