//! `:show` region and `:run` command extraction.
//!
//! Snippet source files can delimit the parts worth displaying with marker
//! lines:
//!
//! ```text
//! // :show start
//! ...displayed code...
//! // :show end
//! ```
//!
//! Files without markers display in full. Regions are dedented individually
//! and joined with a single blank separator line.

const SHOW_START: &str = "// :show start";
const SHOW_END: &str = "// :show end";
const SHOW_MARKER: &str = "// :show ";
const RUN_MARKER: &str = ":run ";

fn is_show_start(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case(SHOW_START)
}

fn is_show_end(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case(SHOW_END)
}

/// True for `:show` annotation and `:run` marker lines. Such a line on the
/// first line of a file is a marker, never a directive.
#[must_use]
pub fn is_marker_line(line: &str) -> bool {
    is_show_start(line)
        || is_show_end(line)
        || line.contains(SHOW_MARKER)
        || line.contains(RUN_MARKER)
}

/// Extract the display lines of a file.
///
/// Lines between `// :show start` and `// :show end` markers are collected,
/// each region dedented by [`shift_lines`], and regions joined with one blank
/// line. If the file has no regions at all, the whole file is displayed
/// (trimmed of surrounding blank lines).
///
/// # Errors
///
/// A start marker inside an open region, an end marker without an open
/// region, or a region left open at end of file are all grammar errors.
pub fn extract_show_regions(lines: &[String]) -> Result<Vec<String>, String> {
    let mut regions: Vec<Vec<String>> = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut in_show = false;

    for line in lines {
        if is_show_start(line) {
            if in_show {
                return Err(format!("consecutive '{SHOW_START}' lines"));
            }
            in_show = true;
            continue;
        }
        if is_show_end(line) {
            if !in_show {
                return Err(format!("'{SHOW_END}' without start line"));
            }
            in_show = false;
            if !current.is_empty() {
                regions.push(std::mem::take(&mut current));
            }
            continue;
        }
        if in_show {
            current.push(line.clone());
        }
    }
    if in_show {
        return Err(format!("'{SHOW_START}' never closed"));
    }

    // no markers at all: show the whole file
    if regions.is_empty() {
        return Ok(trim_blank_lines(lines.to_vec()));
    }

    let mut all = Vec::new();
    for mut region in regions {
        shift_lines(&mut region);
        all.append(&mut region);
        // separator between regions; the trailing one is trimmed below
        all.push(String::new());
    }
    Ok(trim_blank_lines(all))
}

/// Remove the longest common space or tab prefix from non-blank lines.
///
/// The minimum leading-space and leading-tab counts are computed across all
/// non-blank lines. A region mixing space-indented and tab-indented lines,
/// or containing an unindented line, is left untouched.
pub fn shift_lines(lines: &mut [String]) {
    let mut min_spaces: Option<usize> = None;
    let mut min_tabs: Option<usize> = None;

    for line in lines.iter() {
        if line.is_empty() {
            continue;
        }
        let spaces = line.chars().take_while(|&c| c == ' ').count();
        if spaces > 0 {
            min_spaces = Some(min_spaces.map_or(spaces, |m| m.min(spaces)));
            continue;
        }
        let tabs = line.chars().take_while(|&c| c == '\t').count();
        if tabs > 0 {
            min_tabs = Some(min_tabs.map_or(tabs, |m| m.min(tabs)));
            continue;
        }
        // unindented line: nothing common to strip
        return;
    }

    let to_remove = match (min_spaces, min_tabs) {
        (Some(n), None) | (None, Some(n)) => n,
        // mixed indentation styles or all-blank region: leave as-is
        _ => return,
    };

    for line in lines.iter_mut() {
        if !line.is_empty() {
            *line = line[to_remove..].to_string();
        }
    }
}

/// Trim blank lines from both ends and collapse interior blank runs to one.
///
/// Idempotent: `trim_blank_lines(trim_blank_lines(x)) == trim_blank_lines(x)`.
#[must_use]
pub fn trim_blank_lines(mut lines: Vec<String>) -> Vec<String> {
    while lines.first().is_some_and(String::is_empty) {
        lines.remove(0);
    }
    while lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }

    let mut res = Vec::with_capacity(lines.len());
    let mut prev_was_empty = false;
    for line in lines {
        let empty = line.is_empty();
        if !empty || !prev_was_empty {
            res.push(line);
        }
        prev_was_empty = empty;
    }
    res
}

/// Drop `// :show ` annotation lines, collapsing blank runs they leave behind.
#[must_use]
pub fn remove_annotation_lines(lines: Vec<String>) -> Vec<String> {
    let mut res = Vec::with_capacity(lines.len());
    let mut prev_was_empty = false;
    for line in lines {
        if line.contains(SHOW_MARKER) {
            continue;
        }
        let empty = line.is_empty();
        if !empty || !prev_was_empty {
            res.push(line);
        }
        prev_was_empty = empty;
    }
    res
}

/// Find an embedded `:run ${cmd}` marker.
///
/// Only the first occurrence counts. Returns the trimmed command (text after
/// the marker) and the lines with the marker line removed.
#[must_use]
pub fn extract_run_command(lines: Vec<String>) -> (Option<String>, Vec<String>) {
    let mut cmd = None;
    let mut res = Vec::with_capacity(lines.len());
    for line in lines {
        if cmd.is_none()
            && let Some(idx) = line.find(RUN_MARKER)
        {
            cmd = Some(line[idx + RUN_MARKER.len()..].trim().to_string());
            continue;
        }
        res.push(line);
    }
    (cmd, res)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_no_markers_shows_whole_file() {
        let input = lines(&["", "fn main() {}", ""]);
        let res = extract_show_regions(&input).unwrap();
        assert_eq!(res, lines(&["fn main() {}"]));
    }

    #[test]
    fn test_single_region() {
        let input = lines(&[
            "setup()",
            "// :show start",
            "visible()",
            "// :show end",
            "teardown()",
        ]);
        let res = extract_show_regions(&input).unwrap();
        assert_eq!(res, lines(&["visible()"]));
    }

    #[test]
    fn test_regions_joined_by_one_blank_line() {
        let input = lines(&[
            "// :show start",
            "a",
            "// :show end",
            "hidden",
            "// :show start",
            "b",
            "// :show end",
        ]);
        let res = extract_show_regions(&input).unwrap();
        assert_eq!(res, lines(&["a", "", "b"]));
    }

    #[test]
    fn test_markers_case_insensitive_and_padded() {
        let input = lines(&["  // :SHOW START  ", "x", "\t// :Show End"]);
        let res = extract_show_regions(&input).unwrap();
        assert_eq!(res, lines(&["x"]));
    }

    #[test]
    fn test_region_is_dedented() {
        let input = lines(&[
            "// :show start",
            "    a",
            "    b",
            "      c",
            "// :show end",
        ]);
        let res = extract_show_regions(&input).unwrap();
        assert_eq!(res, lines(&["a", "b", "  c"]));
    }

    #[test]
    fn test_empty_region_is_skipped() {
        let input = lines(&[
            "// :show start",
            "// :show end",
            "// :show start",
            "kept",
            "// :show end",
        ]);
        let res = extract_show_regions(&input).unwrap();
        assert_eq!(res, lines(&["kept"]));
    }

    #[test]
    fn test_end_without_start_is_error() {
        let input = lines(&["a", "// :show end"]);
        assert!(extract_show_regions(&input).is_err());
    }

    #[test]
    fn test_double_start_is_error() {
        let input = lines(&["// :show start", "// :show start"]);
        assert!(extract_show_regions(&input).is_err());
    }

    #[test]
    fn test_unclosed_region_is_error() {
        let input = lines(&["// :show start", "a"]);
        assert!(extract_show_regions(&input).is_err());
    }

    #[test]
    fn test_shift_lines_spaces() {
        let mut input = lines(&["    a", "    b", "      c"]);
        shift_lines(&mut input);
        assert_eq!(input, lines(&["a", "b", "  c"]));
    }

    #[test]
    fn test_shift_lines_tabs() {
        let mut input = lines(&["\t\ta", "\tb"]);
        shift_lines(&mut input);
        assert_eq!(input, lines(&["\ta", "b"]));
    }

    #[test]
    fn test_shift_lines_blank_lines_ignored() {
        let mut input = lines(&["  a", "", "  b"]);
        shift_lines(&mut input);
        assert_eq!(input, lines(&["a", "", "b"]));
    }

    #[test]
    fn test_shift_lines_mixed_styles_is_noop() {
        let mut input = lines(&["  a", "\tb"]);
        let expected = input.clone();
        shift_lines(&mut input);
        assert_eq!(input, expected);
    }

    #[test]
    fn test_shift_lines_unindented_line_is_noop() {
        let mut input = lines(&["  a", "b"]);
        let expected = input.clone();
        shift_lines(&mut input);
        assert_eq!(input, expected);
    }

    #[test]
    fn test_trim_blank_lines_ends_and_runs() {
        let input = lines(&["", "", "a", "", "", "b", ""]);
        assert_eq!(trim_blank_lines(input), lines(&["a", "", "b"]));
    }

    #[test]
    fn test_trim_blank_lines_idempotent() {
        let input = lines(&["", "a", "", "", "b", ""]);
        let once = trim_blank_lines(input);
        let twice = trim_blank_lines(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_remove_annotation_lines() {
        let input = lines(&["a", "// :show start", "", "", "b"]);
        assert_eq!(remove_annotation_lines(input), lines(&["a", "", "b"]));
    }

    #[test]
    fn test_extract_run_command() {
        let input = lines(&["// :run go run $file extra", "code"]);
        let (cmd, rest) = extract_run_command(input);
        assert_eq!(cmd.as_deref(), Some("go run $file extra"));
        assert_eq!(rest, lines(&["code"]));
    }

    #[test]
    fn test_extract_run_command_only_first_occurrence() {
        let input = lines(&["// :run first", "// :run second"]);
        let (cmd, rest) = extract_run_command(input);
        assert_eq!(cmd.as_deref(), Some("first"));
        assert_eq!(rest, lines(&["// :run second"]));
    }

    #[test]
    fn test_is_marker_line() {
        assert!(is_marker_line("// :show start"));
        assert!(is_marker_line("  // :SHOW END"));
        assert!(is_marker_line("// :run go run $file"));
        assert!(!is_marker_line("// no output"));
        assert!(!is_marker_line("code()"));
    }

    #[test]
    fn test_extract_run_command_absent() {
        let input = lines(&["a", "b"]);
        let (cmd, rest) = extract_run_command(input.clone());
        assert_eq!(cmd, None);
        assert_eq!(rest, input);
    }
}
