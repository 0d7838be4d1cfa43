//! Static site generation for books.
//!
//! Turns fetched page documents ([`bookgen_notion`]) into a website: builds
//! the page tree, loads and executes embedded code snippets
//! ([`bookgen_snippets`]), renders pages to HTML ([`bookgen_render`]) and
//! writes the output tree with TOC, sitemap and redirects.

mod assemble;
mod book;
mod embeds;
mod error;
mod page;
mod toc;

pub use assemble::{AssembleOptions, assemble_book, render_book};
pub use book::{Book, BookBuilder, BookSpec};
pub use embeds::{EmbedSource, is_sandbox_source, resolve_embed_source};
pub use error::BuildError;
pub use page::{Page, PageEmbed, PageTree, page_url};
pub use toc::toc_js;
