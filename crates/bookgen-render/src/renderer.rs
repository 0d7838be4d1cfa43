//! Recursive block-tree to HTML renderer.
//!
//! Rendering is driven by an explicit [`RenderContext`] holding the nesting
//! level and the toggle/heading counters, threaded through the recursion
//! instead of living in globals. A single [`HtmlRenderer`] is therefore safe
//! to share across concurrently rendered pages.

use std::fmt::Write;

use bookgen_notion::{Block, BlockKind, Document, InlineSpan, normalize_id, unwrap_property};
use tracing::warn;

use crate::error::RenderError;
use crate::highlight::{CodeBoxInfo, Highlighter, code_box, escape_html};
use crate::links::{extract_page_id, urlify};

/// One heading encountered while rendering, for the page's search index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingInfo {
    /// Anchor id assigned to the heading element.
    pub id: String,
    /// Plain heading text.
    pub text: String,
}

/// A resolved internal page reference.
#[derive(Debug, Clone)]
pub struct PageRef {
    pub url: String,
    pub title: String,
}

/// A source-file embed, resolved and executed ahead of rendering.
#[derive(Debug, Clone)]
pub struct ResolvedEmbed {
    pub file_name: String,
    pub lang: String,
    /// Display lines, newline-joined.
    pub display_code: String,
    /// Captured execution output, if any.
    pub output: Option<String>,
    pub github_url: Option<String>,
    pub playground_url: Option<String>,
}

/// Per-book lookups the renderer needs but doesn't own.
pub trait PageResolver {
    /// Resolve a normalized page id to its rendered location.
    fn resolve_page(&self, id: &str) -> Option<PageRef>;

    /// Resolve an embed block's original locator.
    fn resolve_embed(&self, url: &str) -> Option<ResolvedEmbed>;

    /// Highlight language for inline code blocks without one.
    fn default_lang(&self) -> &str;
}

/// Mutable state threaded through one page render.
#[derive(Debug, Default)]
struct RenderContext {
    out: String,
    level: usize,
    next_toggle_id: usize,
    next_heading_id: usize,
    headings: Vec<HeadingInfo>,
}

impl RenderContext {
    /// ` lvl{n}` class suffix, empty at the top level.
    fn level_class(&self) -> String {
        if self.level > 0 {
            format!(" lvl{}", self.level)
        } else {
            String::new()
        }
    }
}

/// Result of rendering one page.
#[derive(Debug)]
pub struct RenderedPage {
    pub html: String,
    pub headings: Vec<HeadingInfo>,
}

/// Block-tree renderer for one book.
pub struct HtmlRenderer<'a> {
    resolver: &'a dyn PageResolver,
    highlighter: &'a dyn Highlighter,
}

impl<'a> HtmlRenderer<'a> {
    pub fn new(resolver: &'a dyn PageResolver, highlighter: &'a dyn Highlighter) -> Self {
        Self {
            resolver,
            highlighter,
        }
    }

    /// Render a page document's body.
    ///
    /// `blocks` is the page's filtered block list (meta and sub-page blocks
    /// already removed by the tree builder).
    ///
    /// # Errors
    ///
    /// [`RenderError::UnsupportedBlock`] on a block the renderer can't place.
    pub fn render_page(
        &self,
        doc: &Document,
        blocks: &[Block],
    ) -> Result<RenderedPage, RenderError> {
        let mut ctx = RenderContext::default();
        if doc.mono_font {
            ctx.out.push_str("<div class=\"mono-font\">\n");
        }
        self.render_blocks(blocks, &mut ctx)?;
        if doc.mono_font {
            ctx.out.push_str("</div>\n");
        }
        Ok(RenderedPage {
            html: ctx.out,
            headings: ctx.headings,
        })
    }

    /// Render a block sequence, grouping consecutive list items.
    ///
    /// Grouping is re-evaluated at every position: any non-list block ends
    /// the current run, and a later list block starts a fresh container.
    fn render_blocks(&self, blocks: &[Block], ctx: &mut RenderContext) -> Result<(), RenderError> {
        let mut i = 0;
        while i < blocks.len() {
            let kind = blocks[i].kind;
            if matches!(
                kind,
                BlockKind::NumberedListItem | BlockKind::BulletedListItem
            ) {
                let mut j = i;
                while j < blocks.len() && blocks[j].kind == kind {
                    j += 1;
                }
                let tag = if kind == BlockKind::NumberedListItem {
                    "ol"
                } else {
                    "ul"
                };
                let _ = writeln!(ctx.out, "<{tag} class=\"list{}\">", ctx.level_class());
                for block in &blocks[i..j] {
                    ctx.out.push_str("<li>");
                    self.render_inline(&block.inline, ctx);
                    self.render_children(block, ctx)?;
                    ctx.out.push_str("</li>\n");
                }
                let _ = writeln!(ctx.out, "</{tag}>");
                i = j;
            } else {
                self.render_block(&blocks[i], ctx)?;
                i += 1;
            }
        }
        Ok(())
    }

    fn render_children(&self, block: &Block, ctx: &mut RenderContext) -> Result<(), RenderError> {
        if block.children.is_empty() {
            return Ok(());
        }
        ctx.level += 1;
        self.render_blocks(&block.children, ctx)?;
        ctx.level -= 1;
        Ok(())
    }

    #[allow(clippy::too_many_lines)]
    fn render_block(&self, block: &Block, ctx: &mut RenderContext) -> Result<(), RenderError> {
        match block.kind {
            BlockKind::Text => {
                let _ = write!(ctx.out, "<p class=\"text{}\">", ctx.level_class());
                self.render_inline(&block.inline, ctx);
                ctx.out.push_str("</p>\n");
                self.render_children(block, ctx)?;
            }
            BlockKind::Header => {
                self.render_heading(block, "h2", ctx)?;
            }
            BlockKind::SubHeader => {
                self.render_heading(block, "h3", ctx)?;
            }
            BlockKind::ToDo => {
                let checked = if block.checked { " todo-checked" } else { "" };
                let _ = write!(
                    ctx.out,
                    "<div class=\"todo{checked}{}\">",
                    ctx.level_class()
                );
                self.render_inline(&block.inline, ctx);
                ctx.out.push_str("</div>\n");
                self.render_children(block, ctx)?;
            }
            BlockKind::Toggle => {
                ctx.next_toggle_id += 1;
                let n = ctx.next_toggle_id;
                let _ = write!(
                    ctx.out,
                    "<div class=\"toggle{}\"><div class=\"toggle-header\" id=\"toggle-toggle-{n}\">",
                    ctx.level_class()
                );
                self.render_inline(&block.inline, ctx);
                let _ = writeln!(
                    ctx.out,
                    "</div>\n<div class=\"toggle-content hidden\" id=\"toggle-content-{n}\">"
                );
                self.render_children(block, ctx)?;
                ctx.out.push_str("</div></div>\n");
            }
            BlockKind::Quote => {
                let _ = write!(ctx.out, "<blockquote class=\"quote{}\">", ctx.level_class());
                self.render_inline(&block.inline, ctx);
                ctx.out.push_str("</blockquote>\n");
                self.render_children(block, ctx)?;
            }
            BlockKind::Divider => {
                ctx.out.push_str("<hr>\n");
            }
            BlockKind::Page | BlockKind::PageLink => {
                self.render_page_link(block, ctx);
            }
            BlockKind::Code => {
                let lang = if block.code_language.is_empty() {
                    self.resolver.default_lang()
                } else {
                    &block.code_language
                };
                let highlighted = self.highlighter.highlight(&block.code, lang);
                ctx.out
                    .push_str(&code_box(&highlighted, &CodeBoxInfo::default()));
            }
            BlockKind::Embed => {
                self.render_embed(block, ctx);
            }
            BlockKind::Bookmark => {
                let title = if block.title.is_empty() {
                    &block.link
                } else {
                    &block.title
                };
                let _ = writeln!(
                    ctx.out,
                    "<div class=\"bookmark\"><a href=\"{}\">{}</a></div>",
                    escape_html(&block.link),
                    escape_html(title)
                );
            }
            BlockKind::Image => {
                let _ = writeln!(
                    ctx.out,
                    "<img class=\"img\" src=\"{}\">",
                    escape_html(&block.source)
                );
            }
            BlockKind::Gist => {
                let _ = writeln!(
                    ctx.out,
                    "<script src=\"{}.js\"></script>",
                    escape_html(&block.source)
                );
            }
            BlockKind::ColumnList => {
                let _ = writeln!(ctx.out, "<div class=\"column-list{}\">", ctx.level_class());
                // columns render at the same level as the list itself
                for column in &block.children {
                    ctx.out.push_str("<div class=\"column\">\n");
                    self.render_blocks(&column.children, ctx)?;
                    ctx.out.push_str("</div>\n");
                }
                ctx.out.push_str("</div>\n");
            }
            BlockKind::CollectionView => {
                self.render_collection(block, ctx);
            }
            BlockKind::Column | BlockKind::NumberedListItem | BlockKind::BulletedListItem => {
                // columns belong inside a column list; list items are
                // grouped by render_blocks before this point
                return Err(RenderError::UnsupportedBlock {
                    id: block.id.clone(),
                    kind: block.kind,
                });
            }
        }
        Ok(())
    }

    fn render_heading(
        &self,
        block: &Block,
        tag: &str,
        ctx: &mut RenderContext,
    ) -> Result<(), RenderError> {
        ctx.next_heading_id += 1;
        let id = ctx.next_heading_id.to_string();
        ctx.headings.push(HeadingInfo {
            id: id.clone(),
            text: plain_text(&block.inline),
        });
        let _ = write!(ctx.out, "<{tag} id=\"{id}\" class=\"hdr{}\">", ctx.level_class());
        self.render_inline(&block.inline, ctx);
        let _ = writeln!(ctx.out, "</{tag}>");
        self.render_children(block, ctx)
    }

    fn render_page_link(&self, block: &Block, ctx: &mut RenderContext) {
        let id = normalize_id(&block.id);
        let (url, title) = match self.resolver.resolve_page(&id) {
            Some(page) => (page.url, page.title),
            None => {
                warn!(id, title = %block.title, "page link to unknown page");
                (
                    format!("/article/{id}/{}", urlify(&block.title)),
                    block.title.clone(),
                )
            }
        };
        let _ = writeln!(
            ctx.out,
            "<div class=\"page-link\"><a href=\"{}\">{}</a></div>",
            escape_html(&url),
            escape_html(&title)
        );
    }

    fn render_embed(&self, block: &Block, ctx: &mut RenderContext) {
        let Some(embed) = self.resolver.resolve_embed(&block.source) else {
            warn!(url = %block.source, "unresolved embed, skipping");
            return;
        };
        let highlighted = self.highlighter.highlight(&embed.display_code, &embed.lang);
        let info = CodeBoxInfo {
            file_name: Some(&embed.file_name),
            github_url: embed.github_url.as_deref(),
            playground_url: embed.playground_url.as_deref(),
            output: embed.output.as_deref(),
        };
        ctx.out.push_str(&code_box(&highlighted, &info));
    }

    fn render_collection(&self, block: &Block, ctx: &mut RenderContext) {
        let Some(view) = &block.collection else {
            warn!(id = %block.id, "collection view without table data");
            return;
        };
        ctx.out.push_str("<table class=\"collection\">\n<tr>");
        for column in &view.columns {
            let _ = write!(ctx.out, "<th>{}</th>", escape_html(column));
        }
        ctx.out.push_str("</tr>\n");
        for row in &view.rows {
            ctx.out.push_str("<tr>");
            for cell in row {
                let value = unwrap_property(cell);
                if let bookgen_notion::ProviderValue::Mismatch(name) = &value {
                    warn!(id = %block.id, kind = name, "unexpected collection value shape");
                }
                let _ = write!(ctx.out, "<td>{}</td>", escape_html(&value.display()));
            }
            ctx.out.push_str("</tr>\n");
        }
        ctx.out.push_str("</table>\n");
    }

    fn render_inline(&self, spans: &[InlineSpan], ctx: &mut RenderContext) {
        for span in spans {
            let mut html = self.inline_body(span);
            // fixed nesting order, innermost first
            if span.code {
                html = format!("<code>{html}</code>");
            }
            if span.strikethrough {
                html = format!("<strike>{html}</strike>");
            }
            if span.italic {
                html = format!("<i>{html}</i>");
            }
            if span.bold {
                html = format!("<b>{html}</b>");
            }
            ctx.out.push_str(&html);
        }
    }

    /// Innermost inline content: a mention, a link, or plain text.
    fn inline_body(&self, span: &InlineSpan) -> String {
        if let Some(user_id) = &span.user_id {
            return format!("<span class=\"user\">@{}</span>", escape_html(user_id));
        }
        if let Some(date) = &span.date {
            return format!("<span class=\"date\">{}</span>", escape_html(date));
        }
        if let Some(link) = &span.link {
            let href = self.resolve_link(link);
            return format!(
                "<a href=\"{}\">{}</a>",
                escape_html(&href),
                escape_html(&span.text)
            );
        }
        escape_html(&span.text)
    }

    /// Rewrite an internal link to the target page's URL when it resolves.
    fn resolve_link(&self, link: &str) -> String {
        let Some(id) = extract_page_id(link) else {
            return link.to_string();
        };
        match self.resolver.resolve_page(&id) {
            Some(page) => page.url,
            None => {
                warn!(link, id, "possibly broken internal link");
                link.to_string()
            }
        }
    }
}

/// Concatenated plain text of inline spans.
#[must_use]
pub fn plain_text(spans: &[InlineSpan]) -> String {
    spans.iter().map(|s| s.text.as_str()).collect()
}
