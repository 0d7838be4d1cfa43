//! Snippet execution and the policy for when captured output is (re)used.

use std::fs;
use std::process::Command;

use tracing::{debug, info, warn};

use crate::error::SnippetError;
use crate::output_cache::OutputStore;
use crate::source_file::SourceFile;

/// Extensions that are data, never executed even without `no output`.
const DATA_EXTENSIONS: &[&str] = &["json", "csv", "yml", "yaml", "xml", "txt"];

/// How [`capture_output`] treats existing cache entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputPolicy {
    /// Use cached output when present, execute on miss.
    UseCache,
    /// Ignore cached entries and re-execute everything.
    Rerun,
}

/// Fill in `file.output`, executing the snippet if the store has no entry.
///
/// Files carrying `no output` and data files are skipped. Fresh output is
/// recorded in the store but not flushed.
///
/// # Errors
///
/// Unexecutable files and failed runs (unless the directive allows errors).
pub fn capture_output(
    file: &mut SourceFile,
    store: &mut OutputStore,
    policy: OutputPolicy,
) -> Result<(), SnippetError> {
    if file.directive.no_output {
        return Ok(());
    }
    if DATA_EXTENSIONS.contains(&file.extension().as_str()) {
        return Ok(());
    }

    if policy == OutputPolicy::UseCache
        && let Some(cached) = store.get(&file.sha)
    {
        debug!(file = %file.path.display(), "using cached output");
        file.output = Some(cached.to_string());
        return Ok(());
    }

    info!(file = %file.path.display(), "executing snippet");
    let output = execute_snippet(file)?;
    store.record(&file.sha, &output);
    file.output = Some(output);
    Ok(())
}

/// Run a snippet and capture its combined stdout + stderr.
///
/// The command comes from the file's `:run` marker when present, with
/// `$file` standing for the snippet's base file name; otherwise the
/// extension picks a default runner. Execution happens in the snippet's
/// directory, and any occurrence of that directory in the output is
/// stripped so captured text is machine-independent.
///
/// # Errors
///
/// Unparsable `:run` commands, extensions with no runner, spawn failures,
/// and non-zero exits without `allow error`.
pub fn execute_snippet(file: &SourceFile) -> Result<String, SnippetError> {
    let args = command_for(file)?;
    // the subprocess sees the absolute path, so strip that form
    let dir = fs::canonicalize(file.path.parent().unwrap_or_else(|| ".".as_ref()))?;

    let result = Command::new(&args[0])
        .args(&args[1..])
        .current_dir(&dir)
        .output()?;

    let mut combined = String::new();
    combined.push_str(&String::from_utf8_lossy(&result.stdout));
    combined.push_str(&String::from_utf8_lossy(&result.stderr));
    let combined = combined
        .replace("\r\n", "\n")
        .replace(&*dir.to_string_lossy(), "");

    if !result.status.success() {
        if file.directive.allow_error {
            warn!(file = %file.path.display(), status = %result.status, "expected failure");
        } else {
            return Err(SnippetError::Execution {
                path: file.path.clone(),
                output: combined,
            });
        }
    }
    Ok(combined)
}

/// Resolve the argv to run for a snippet.
fn command_for(file: &SourceFile) -> Result<Vec<String>, SnippetError> {
    if let Some(cmd) = &file.run_cmd {
        let Some(mut args) = shlex::split(cmd) else {
            return Err(SnippetError::parse(
                &file.path,
                format!("unparsable run command '{cmd}'"),
            ));
        };
        if args.is_empty() {
            return Err(SnippetError::parse(&file.path, "empty run command"));
        }
        for arg in &mut args {
            if arg == "$file" {
                arg.clone_from(&file.file_name);
            }
        }
        return Ok(args);
    }

    match file.extension().as_str() {
        "go" => Ok(vec![
            "go".to_string(),
            "run".to_string(),
            file.file_name.clone(),
        ]),
        ext => Err(SnippetError::UnsupportedExtension {
            path: file.path.clone(),
            ext: ext.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output_cache::content_hash;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn snippet(dir: &TempDir, name: &str, content: &str) -> SourceFile {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        SourceFile::load(&path, "u").unwrap()
    }

    #[test]
    fn test_command_from_run_marker() {
        let dir = TempDir::new().unwrap();
        let file = snippet(&dir, "a.py", "# :run python3 $file --flag\nprint(1)\n");
        let args = command_for(&file).unwrap();
        assert_eq!(args, vec!["python3", "a.py", "--flag"]);
    }

    #[test]
    fn test_command_quoted_args() {
        let dir = TempDir::new().unwrap();
        let file = snippet(&dir, "a.sh", "# :run sh -c 'echo hi there'\n");
        let args = command_for(&file).unwrap();
        assert_eq!(args, vec!["sh", "-c", "echo hi there"]);
    }

    #[test]
    fn test_command_unclosed_quote_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let file = snippet(&dir, "a.sh", "# :run sh -c 'oops\n");
        assert!(matches!(
            command_for(&file),
            Err(SnippetError::Parse { .. })
        ));
    }

    #[test]
    fn test_default_runner_for_go() {
        let dir = TempDir::new().unwrap();
        let file = snippet(&dir, "main.go", "package main\n");
        let args = command_for(&file).unwrap();
        assert_eq!(args, vec!["go", "run", "main.go"]);
    }

    #[test]
    fn test_unknown_extension_is_error() {
        let dir = TempDir::new().unwrap();
        let file = snippet(&dir, "a.zig", "const x = 1;\n");
        assert!(matches!(
            command_for(&file),
            Err(SnippetError::UnsupportedExtension { .. })
        ));
    }

    #[test]
    fn test_execute_captures_stdout() {
        let dir = TempDir::new().unwrap();
        let file = snippet(&dir, "hello.sh", "# :run sh $file\necho hello\n");
        let output = execute_snippet(&file).unwrap();
        assert_eq!(output, "hello\n");
    }

    #[test]
    fn test_execute_strips_absolute_dir_from_relative_path() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        // a non-canonical path: the subprocess still prints the canonical one
        let path = dir.path().join("sub").join("..").join("p.sh");
        fs::write(&path, "# :run pwd\n").unwrap();
        let file = SourceFile::load(&path, "u").unwrap();
        let output = execute_snippet(&file).unwrap();
        let canonical = fs::canonicalize(dir.path()).unwrap();
        assert!(!output.contains(&*canonical.to_string_lossy()));
        assert_eq!(output, "\n");
    }

    #[test]
    fn test_execute_failure_is_error() {
        let dir = TempDir::new().unwrap();
        let file = snippet(&dir, "boom.sh", "# :run sh $file\nexit 3\n");
        assert!(matches!(
            execute_snippet(&file),
            Err(SnippetError::Execution { .. })
        ));
    }

    #[test]
    fn test_allow_error_keeps_output() {
        let dir = TempDir::new().unwrap();
        let file = snippet(
            &dir,
            "boom.sh",
            "// allow error\n# :run sh -c 'echo before; exit 3'\n",
        );
        let output = execute_snippet(&file).unwrap();
        assert_eq!(output, "before\n");
    }

    #[test]
    fn test_capture_skips_no_output() {
        let dir = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        let mut store = OutputStore::load(cache_dir.path()).unwrap();
        let mut file = snippet(&dir, "a.zig", "// no output\nconst x = 1;\n");
        capture_output(&mut file, &mut store, OutputPolicy::UseCache).unwrap();
        assert_eq!(file.output, None);
    }

    #[test]
    fn test_capture_skips_data_files() {
        let dir = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        let mut store = OutputStore::load(cache_dir.path()).unwrap();
        let mut file = snippet(&dir, "data.json", "{\"a\": 1}\n");
        capture_output(&mut file, &mut store, OutputPolicy::UseCache).unwrap();
        assert_eq!(file.output, None);
    }

    #[test]
    fn test_capture_uses_cache_without_executing() {
        let dir = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        let mut store = OutputStore::load(cache_dir.path()).unwrap();
        // .zig has no runner, so execution would fail; a cache hit avoids it
        let mut file = snippet(&dir, "a.zig", "const x = 1;\n");
        store.record(&file.sha, "cached output");
        capture_output(&mut file, &mut store, OutputPolicy::UseCache).unwrap();
        assert_eq!(file.output.as_deref(), Some("cached output"));
    }

    #[test]
    fn test_capture_records_fresh_output() {
        let dir = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        let mut store = OutputStore::load(cache_dir.path()).unwrap();
        let mut file = snippet(&dir, "hi.sh", "# :run sh $file\necho hi\n");
        capture_output(&mut file, &mut store, OutputPolicy::UseCache).unwrap();
        assert_eq!(file.output.as_deref(), Some("hi\n"));
        assert_eq!(store.get(&file.sha), Some("hi\n"));
    }

    #[test]
    fn test_rerun_policy_ignores_cache() {
        let dir = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        let mut store = OutputStore::load(cache_dir.path()).unwrap();
        let mut file = snippet(&dir, "hi.sh", "# :run sh $file\necho fresh\n");
        store.record(&file.sha, "stale");
        capture_output(&mut file, &mut store, OutputPolicy::Rerun).unwrap();
        assert_eq!(file.output.as_deref(), Some("fresh\n"));
        assert_eq!(store.get(&file.sha), Some("fresh\n"));
    }

    #[test]
    fn test_content_hash_matches_loaded_sha() {
        let dir = TempDir::new().unwrap();
        let file = snippet(&dir, "a.go", "package main\n");
        assert_eq!(file.sha, content_hash("package main"));
    }
}
