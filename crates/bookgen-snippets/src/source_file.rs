//! Loading and preprocessing of embedded snippet source files.

use std::fs;
use std::path::{Path, PathBuf};

use crate::directive::{FileDirective, parse_directive};
use crate::error::SnippetError;
use crate::output_cache::content_hash;
use crate::show::{
    extract_run_command, extract_show_regions, is_marker_line, remove_annotation_lines,
    trim_blank_lines,
};

/// A source file referenced by an embed block, fully preprocessed.
///
/// `lines` are the filtered lines (directive and annotation lines removed),
/// which drive execution and content hashing. `display_lines` are what ends
/// up in the rendered code box.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Original embed URL as it appeared in the page.
    pub embed_url: String,
    /// Base file name, used for `$file` substitution and display captions.
    pub file_name: String,
    /// Location on disk.
    pub path: PathBuf,
    /// Highlighting language derived from the extension.
    pub lang: String,
    /// Directive parsed off the first line, default when absent.
    pub directive: FileDirective,
    /// Command from an embedded `:run` marker, if any.
    pub run_cmd: Option<String>,
    /// Filtered content lines.
    pub lines: Vec<String>,
    /// Lines shown in the code box.
    pub display_lines: Vec<String>,
    /// Captured execution output, filled in by the execution step.
    pub output: Option<String>,
    /// Hex SHA-256 of the newline-joined filtered lines.
    pub sha: String,
}

impl SourceFile {
    /// Load and preprocess a snippet file.
    ///
    /// Line endings are normalized to `\n` before any parsing, so the same
    /// file checked out on different platforms hashes identically.
    ///
    /// # Errors
    ///
    /// I/O failures and directive / show-marker grammar violations.
    pub fn load(path: &Path, embed_url: &str) -> Result<Self, SnippetError> {
        let raw = fs::read_to_string(path)?;
        let normalized = raw.replace("\r\n", "\n");
        let mut lines: Vec<String> = normalized
            .trim_end_matches('\n')
            .split('\n')
            .map(ToString::to_string)
            .collect();

        // a region or run marker on the first line is not a directive
        let directive = match lines.first() {
            Some(first) if !is_marker_line(first) => match parse_directive(first) {
                Ok(Some(d)) => {
                    lines.remove(0);
                    d
                }
                Ok(None) => FileDirective::default(),
                Err(reason) => return Err(SnippetError::parse(path, reason)),
            },
            _ => FileDirective::default(),
        };

        let (run_cmd, lines) = extract_run_command(lines);

        let mut display_lines =
            extract_show_regions(&lines).map_err(|reason| SnippetError::parse(path, reason))?;
        if let Some(limit) = directive.line_limit {
            display_lines.truncate(limit);
        }

        let lines = trim_blank_lines(remove_annotation_lines(lines));
        let sha = content_hash(&lines.join("\n"));

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let lang = lang_from_path(path);

        Ok(Self {
            embed_url: embed_url.to_string(),
            file_name,
            path: path.to_path_buf(),
            lang,
            directive,
            run_cmd,
            lines,
            display_lines,
            output: None,
            sha,
        })
    }

    /// Lowercased extension, empty when missing.
    #[must_use]
    pub fn extension(&self) -> String {
        self.path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    }

    /// Display text of the code box.
    #[must_use]
    pub fn display_code(&self) -> String {
        self.display_lines.join("\n")
    }
}

/// Map a file extension to a highlighter language name.
fn lang_from_path(path: &Path) -> String {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "json" => "js".to_string(),
        "csv" | "txt" => "text".to_string(),
        "yml" => "yaml".to_string(),
        _ => ext,
    }
}
