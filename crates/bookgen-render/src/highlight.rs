//! Syntax highlighting boundary and code-box assembly.

use std::fmt::Write;

/// Escape text for HTML element content and attribute values.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Turns source code into highlighted HTML.
pub trait Highlighter {
    /// Produce a self-contained HTML fragment for `code` in `lang`.
    fn highlight(&self, code: &str, lang: &str) -> String;
}

/// Escaping-only highlighter; real colorizing happens client-side.
pub struct PlainHighlighter;

impl Highlighter for PlainHighlighter {
    fn highlight(&self, code: &str, lang: &str) -> String {
        format!(
            "<pre class=\"highlight lang-{}\"><code>{}</code></pre>",
            escape_html(lang),
            escape_html(code)
        )
    }
}

/// Extras attached to a rendered code box.
#[derive(Debug, Default)]
pub struct CodeBoxInfo<'a> {
    /// Caption file name shown in the box nav.
    pub file_name: Option<&'a str>,
    /// "view on GitHub" target.
    pub github_url: Option<&'a str>,
    /// "try online" target.
    pub playground_url: Option<&'a str>,
    /// Captured execution output, shown under the code when non-empty.
    pub output: Option<&'a str>,
}

/// Wrap highlighted code in the standard code-box layout.
#[must_use]
pub fn code_box(code_html: &str, info: &CodeBoxInfo<'_>) -> String {
    let mut out = String::new();
    out.push_str("<div class=\"code-box\">\n");

    let mut nav = String::new();
    if let Some(name) = info.file_name {
        let _ = write!(nav, "<span class=\"code-box-file\">{}</span>", escape_html(name));
    }
    if let Some(url) = info.github_url {
        let _ = write!(
            nav,
            "<a class=\"code-box-github\" href=\"{}\">view on GitHub</a>",
            escape_html(url)
        );
    }
    if let Some(url) = info.playground_url {
        let _ = write!(
            nav,
            "<a class=\"code-box-playground\" href=\"{}\">try online</a>",
            escape_html(url)
        );
    }
    if !nav.is_empty() {
        let _ = writeln!(out, "<div class=\"code-box-nav\">{nav}</div>");
    }

    out.push_str(code_html);
    out.push('\n');

    if let Some(output) = info.output
        && !output.is_empty()
    {
        let _ = writeln!(
            out,
            "<div class=\"code-box-output\"><div class=\"code-box-output-title\">output:</div><pre>{}</pre></div>",
            escape_html(output)
        );
    }

    out.push_str("</div>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">&'"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;"
        );
    }

    #[test]
    fn test_plain_highlighter_escapes() {
        let html = PlainHighlighter.highlight("if a < b {}", "go");
        assert_eq!(
            html,
            "<pre class=\"highlight lang-go\"><code>if a &lt; b {}</code></pre>"
        );
    }

    #[test]
    fn test_code_box_bare() {
        let html = code_box("<pre>x</pre>", &CodeBoxInfo::default());
        assert_eq!(html, "<div class=\"code-box\">\n<pre>x</pre>\n</div>\n");
    }

    #[test]
    fn test_code_box_with_links_and_output() {
        let info = CodeBoxInfo {
            file_name: Some("main.go"),
            github_url: Some("https://github.com/x/main.go"),
            playground_url: Some("https://play/x"),
            output: Some("hello\n"),
        };
        let html = code_box("<pre>code</pre>", &info);
        assert!(html.contains("code-box-file\">main.go"));
        assert!(html.contains("href=\"https://github.com/x/main.go\">view on GitHub"));
        assert!(html.contains("href=\"https://play/x\">try online"));
        assert!(html.contains("<div class=\"code-box-output\">"));
        assert!(html.contains("<pre>hello\n</pre>"));
    }

    #[test]
    fn test_code_box_empty_output_omitted() {
        let info = CodeBoxInfo {
            output: Some(""),
            ..CodeBoxInfo::default()
        };
        let html = code_box("<pre>c</pre>", &info);
        assert!(!html.contains("code-box-output"));
    }
}
