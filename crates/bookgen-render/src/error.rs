//! Renderer error type.

use bookgen_notion::BlockKind;

/// Error while rendering a page's block tree.
///
/// Rendering fails fast: a block the renderer can't place is a data-contract
/// violation from the content provider, not something to paper over.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// A block kind in a position the renderer doesn't support (e.g. a
    /// bare column outside a column list).
    #[error("unsupported block '{kind:?}' (id {id})")]
    UnsupportedBlock {
        /// Offending block id.
        id: String,
        /// Offending block kind.
        kind: BlockKind,
    },
}
