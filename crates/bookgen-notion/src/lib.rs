//! Content-provider boundary.
//!
//! Everything the rest of the pipeline knows about the content service
//! lives here: the typed block-tree document model, the [`PageProvider`]
//! trait with its HTTP implementation, the on-disk page cache, and the
//! breadth-first loader that pulls a whole page graph through the cache.

mod cache;
mod client;
mod error;
pub mod types;

pub use cache::{CachePolicy, PageCache, fetch_page, load_page_graph};
pub use client::{HttpPageProvider, PageProvider};
pub use error::FetchError;
pub use types::{
    Block, BlockKind, CollectionView, Document, InlineSpan, ProviderValue, is_valid_page_id,
    normalize_id, unwrap_property,
};
