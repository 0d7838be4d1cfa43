//! File directive parsing.
//!
//! The first line of a snippet source file may be a single-line comment
//! carrying comma-separated rendering directives:
//!
//! ```text
//! // no output, no playground, allow error, line 10
//! ```
//!
//! A comment line whose clauses are all empty is "no directive present", not
//! an error. Any clause outside the recognized vocabulary is a parse error,
//! so a typo like `no outpt` fails the build instead of changing rendering.

/// Parsed snippet rendering directives from a file's first line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileDirective {
    /// `no output`: never execute the file or show captured output.
    pub no_output: bool,
    /// `no playground` / `noplayground`: suppress the "try online" link.
    pub no_playground: bool,
    /// `allow error`: a non-zero exit from the snippet is expected; record
    /// the captured output instead of failing the build.
    pub allow_error: bool,
    /// `line ${n}`: show at most the first `n` display lines.
    pub line_limit: Option<usize>,
}

/// Parse an optional directive from the first line of a source file.
///
/// Returns `Ok(None)` if the line is not a `//` comment at all. Returns the
/// default (empty) directive for a comment with no clauses.
///
/// # Errors
///
/// Returns the offending clause if it's not in the recognized vocabulary.
/// Parsing is idempotent: the same input always yields the same result.
pub fn parse_directive(line: &str) -> Result<Option<FileDirective>, String> {
    let trimmed = line.trim();
    let Some(rest) = trimmed.strip_prefix("//") else {
        return Ok(None);
    };

    let mut directive = FileDirective::default();
    for clause in rest.split(',') {
        let clause = clause.trim();
        match clause {
            "" => {}
            "no output" => directive.no_output = true,
            "no playground" | "noplayground" => directive.no_playground = true,
            "allow error" => directive.allow_error = true,
            _ => {
                let Some(n) = clause.strip_prefix("line ") else {
                    return Err(format!("invalid directive clause '{clause}'"));
                };
                let n: usize = n
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid directive clause '{clause}'"))?;
                directive.line_limit = Some(n);
            }
        }
    }
    Ok(Some(directive))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_comment_line_is_no_directive() {
        assert_eq!(parse_directive("package main"), Ok(None));
        assert_eq!(parse_directive("fn main() {}"), Ok(None));
    }

    #[test]
    fn test_empty_comment_is_empty_directive() {
        assert_eq!(parse_directive("//"), Ok(Some(FileDirective::default())));
        assert_eq!(parse_directive("//   "), Ok(Some(FileDirective::default())));
    }

    #[test]
    fn test_single_clauses() {
        let d = parse_directive("// no output").unwrap().unwrap();
        assert!(d.no_output);
        assert!(!d.allow_error);

        let d = parse_directive("// allow error").unwrap().unwrap();
        assert!(d.allow_error);

        let d = parse_directive("// no playground").unwrap().unwrap();
        assert!(d.no_playground);

        // one-word spelling variant
        let d = parse_directive("// noplayground").unwrap().unwrap();
        assert!(d.no_playground);
    }

    #[test]
    fn test_all_clauses_combined() {
        let d = parse_directive("// no output, no playground, allow error, line 12")
            .unwrap()
            .unwrap();
        assert!(d.no_output);
        assert!(d.no_playground);
        assert!(d.allow_error);
        assert_eq!(d.line_limit, Some(12));
    }

    #[test]
    fn test_line_limit() {
        let d = parse_directive("// line 5").unwrap().unwrap();
        assert_eq!(d.line_limit, Some(5));
    }

    #[test]
    fn test_unknown_clause_is_error() {
        assert!(parse_directive("// no outpt").is_err());
        assert!(parse_directive("// no output, frobnicate").is_err());
        assert!(parse_directive("// line five").is_err());
    }

    #[test]
    fn test_error_even_after_valid_clauses() {
        // an unrecognized token is always an error, regardless of earlier
        // successful clauses
        assert!(parse_directive("// no output, allow error, bogus").is_err());
    }

    #[test]
    fn test_parse_is_idempotent() {
        let line = "// no output, line 3";
        assert_eq!(parse_directive(line), parse_directive(line));
    }

    #[test]
    fn test_leading_whitespace_tolerated() {
        let d = parse_directive("   // no output").unwrap().unwrap();
        assert!(d.no_output);
    }
}
