//! Site assembly: concurrent page rendering and file output.
//!
//! Rendering fans out over a bounded rayon pool. Everything the render
//! workers touch (the tree, the id index, the embeds with their captured
//! output) is built beforehand and only read during the fan-out; all file
//! writes happen sequentially afterwards.

use std::fs;
use std::path::PathBuf;
use std::thread;

use bookgen_render::{
    HeadingInfo, HtmlRenderer, PageRef, PageResolver, PlainHighlighter, RenderError, RenderedPage,
    ResolvedEmbed, escape_html,
};
use rayon::prelude::*;
use tracing::info;

use crate::book::Book;
use crate::error::BuildError;
use crate::page::Page;
use crate::toc::toc_js;

/// Public base URL the sitemap is written against.
const SITE_URL: &str = "https://www.programming-books.io";

/// Pool headroom left for snippet subprocesses and I/O.
const THREAD_RESERVE: usize = 2;

/// Output location and page-shell options.
#[derive(Debug, Clone)]
pub struct AssembleOptions {
    pub out_dir: PathBuf,
    /// Analytics id injected into every page shell.
    pub analytics: Option<String>,
}

/// Render a book and write its pages, TOC, sitemap and redirects.
///
/// # Errors
///
/// Render and I/O failures.
pub fn assemble_book(book: &Book, opts: &AssembleOptions) -> Result<(), BuildError> {
    let rendered = render_book(book)?;

    let book_dir = opts.out_dir.join("essential").join(&book.spec.dir);
    fs::create_dir_all(&book_dir)?;

    let mut headings: Vec<Vec<HeadingInfo>> = Vec::with_capacity(rendered.len());
    for (i, page) in rendered.iter().enumerate() {
        let rel = book.url_of(i);
        let path = opts
            .out_dir
            .join(format!("{}.html", rel.trim_start_matches('/')));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let title = &book.tree.nodes[i].title;
        fs::write(&path, page_shell(book, title, &page.html, opts))?;
        headings.push(page.headings.clone());
    }

    fs::write(book_dir.join("toc.js"), toc_js(book, &headings)?)?;
    fs::write(book_dir.join("sitemap.xml"), sitemap_xml(book))?;
    fs::write(book_dir.join("_redirects"), redirects(book))?;
    info!(book = %book.spec.title, pages = rendered.len(), "book assembled");
    Ok(())
}

/// Render all pages of a book over a bounded worker pool.
///
/// Results come back in arena (reading) order.
///
/// # Errors
///
/// The first [`RenderError`] aborts the whole book.
pub fn render_book(book: &Book) -> Result<Vec<RenderedPage>, BuildError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(worker_count())
        .build()?;

    let rendered: Result<Vec<RenderedPage>, RenderError> = pool.install(|| {
        book.tree
            .nodes
            .par_iter()
            .map(|page| {
                let resolver = BookResolver { book, page };
                HtmlRenderer::new(&resolver, &PlainHighlighter)
                    .render_page(&page.doc, &page.blocks)
            })
            .collect()
    });
    Ok(rendered?)
}

/// Available parallelism minus a small reserve, at least one.
fn worker_count() -> usize {
    thread::available_parallelism()
        .map_or(1, |n| n.get().saturating_sub(THREAD_RESERVE).max(1))
}

/// Per-page view of a book for the renderer.
struct BookResolver<'a> {
    book: &'a Book,
    page: &'a Page,
}

impl PageResolver for BookResolver<'_> {
    fn resolve_page(&self, id: &str) -> Option<PageRef> {
        let &idx = self.book.index.get(id)?;
        Some(PageRef {
            url: self.book.url_of(idx),
            title: self.book.tree.nodes[idx].title.clone(),
        })
    }

    fn resolve_embed(&self, url: &str) -> Option<ResolvedEmbed> {
        let embed = self.page.embeds.get(url)?;
        Some(ResolvedEmbed {
            file_name: embed.file.file_name.clone(),
            lang: embed.file.lang.clone(),
            display_code: embed.file.display_code(),
            output: embed.file.output.clone(),
            github_url: Some(embed.github_url.clone()),
            playground_url: self.book.playground_url_for(&embed.file),
        })
    }

    fn default_lang(&self) -> &str {
        &self.book.spec.default_lang
    }
}

fn page_shell(book: &Book, title: &str, body: &str, opts: &AssembleOptions) -> String {
    let analytics = opts.analytics.as_deref().map_or(String::new(), |id| {
        format!(
            "<script async src=\"https://www.googletagmanager.com/gtag/js?id={id}\"></script>\n"
        )
    });
    format!(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{} — {}</title>\n\
         <link rel=\"stylesheet\" href=\"/s/main.css\">\n\
         <script defer src=\"toc.js\"></script>\n{analytics}</head>\n<body>\n{body}</body>\n</html>\n",
        escape_html(title),
        escape_html(&book.spec.title),
    )
}

fn sitemap_xml(book: &Book) -> String {
    let mut out = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for i in 0..book.tree.nodes.len() {
        out.push_str(&format!(
            "<url><loc>{SITE_URL}{}</loc></url>\n",
            book.url_of(i)
        ));
    }
    out.push_str("</urlset>\n");
    out
}

/// Bare-id URLs redirect to the canonical id-and-slug form.
fn redirects(book: &Book) -> String {
    let mut out = String::new();
    for (i, page) in book.tree.nodes.iter().enumerate() {
        out.push_str(&format!(
            "/essential/{}/{} {} 301\n",
            book.spec.dir,
            page.url_id(),
            book.url_of(i)
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::BookSpec;
    use crate::page::PageTree;
    use bookgen_notion::Document;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn test_book() -> Book {
        let root: Document = serde_json::from_value(json!({
            "id": "r",
            "root": {"id": "r", "kind": "page", "title": "Root", "children": [
                {"id": "h", "kind": "header", "inline": [{"text": "Intro"}]},
                {"id": "c", "kind": "page", "title": "Child & Co"},
            ]},
        }))
        .unwrap();
        let child: Document = serde_json::from_value(json!({
            "id": "c",
            "root": {"id": "c", "kind": "page", "title": "Child & Co", "children": [
                {"id": "t", "kind": "text", "inline": [{"text": "hello"}]},
            ]},
        }))
        .unwrap();
        let docs = HashMap::from([("r".to_string(), root), ("c".to_string(), child)]);
        let tree = PageTree::build("r", &docs).unwrap();
        let index = tree.index_by_id();
        Book::for_tests(
            BookSpec {
                title: "Essential Test".to_string(),
                dir: "test".to_string(),
                root_page_id: "r".to_string(),
                default_lang: "go".to_string(),
            },
            tree,
            index,
        )
    }

    #[test]
    fn test_render_book_orders_and_collects_headings() {
        let book = test_book();
        let rendered = render_book(&book).unwrap();
        assert_eq!(rendered.len(), 2);
        assert_eq!(rendered[0].headings.len(), 1);
        assert_eq!(rendered[0].headings[0].text, "Intro");
        assert!(rendered[1].html.contains("hello"));
    }

    #[test]
    fn test_assemble_writes_pages_and_indexes() {
        let book = test_book();
        let out = TempDir::new().unwrap();
        let opts = AssembleOptions {
            out_dir: out.path().to_path_buf(),
            analytics: None,
        };
        assemble_book(&book, &opts).unwrap();

        let root_page = out.path().join("essential/test/r-root.html");
        let child_page = out.path().join("essential/test/c-child-co.html");
        assert!(root_page.exists());
        assert!(child_page.exists());

        let html = fs::read_to_string(&child_page).unwrap();
        assert!(html.contains("<title>Child &amp; Co — Essential Test</title>"));
        assert!(html.contains("hello"));

        let toc = fs::read_to_string(out.path().join("essential/test/toc.js")).unwrap();
        assert!(toc.contains("Intro"));

        let sitemap = fs::read_to_string(out.path().join("essential/test/sitemap.xml")).unwrap();
        assert!(
            sitemap.contains("<loc>https://www.programming-books.io/essential/test/r-root</loc>")
        );

        let redirects = fs::read_to_string(out.path().join("essential/test/_redirects")).unwrap();
        assert!(redirects.contains("/essential/test/c /essential/test/c-child-co 301"));
    }

    #[test]
    fn test_page_shell_analytics_injected() {
        let book = test_book();
        let opts = AssembleOptions {
            out_dir: PathBuf::new(),
            analytics: Some("UA-1".to_string()),
        };
        let html = page_shell(&book, "T", "<p>b</p>", &opts);
        assert!(html.contains("gtag/js?id=UA-1"));
    }
}
