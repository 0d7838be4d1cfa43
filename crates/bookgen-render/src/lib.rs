//! Block-tree to HTML rendering.
//!
//! The [`HtmlRenderer`] walks a page's filtered block list and produces the
//! page body HTML plus the heading index used for search. Page and embed
//! lookups go through the [`PageResolver`] trait so the renderer stays
//! independent of how a book organizes its pages and snippets; syntax
//! highlighting goes through [`Highlighter`] the same way.

mod error;
pub mod highlight;
pub mod links;
mod renderer;

pub use error::RenderError;
pub use highlight::{CodeBoxInfo, Highlighter, PlainHighlighter, code_box, escape_html};
pub use links::{extract_page_id, urlify};
pub use renderer::{
    HeadingInfo, HtmlRenderer, PageRef, PageResolver, RenderedPage, ResolvedEmbed, plain_text,
};
