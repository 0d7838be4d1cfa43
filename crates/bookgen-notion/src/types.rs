//! Block-tree document model as delivered by the content provider.
//!
//! A document is a tree of typed blocks with inline rich-text spans. The
//! model is deliberately flat and permissive on the wire (most fields are
//! optional and default) because the provider only populates the fields a
//! given block kind uses.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fixed block vocabulary.
///
/// Anything outside this set fails deserialization, which surfaces as a
/// fetch-level JSON error rather than a half-parsed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockKind {
    /// Document root and sub-page blocks.
    Page,
    Text,
    Header,
    SubHeader,
    ToDo,
    Toggle,
    Quote,
    Divider,
    PageLink,
    Code,
    Bookmark,
    Gist,
    Image,
    ColumnList,
    Column,
    CollectionView,
    Embed,
    NumberedListItem,
    BulletedListItem,
}

/// One typed node in a document's block tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    /// Provider-assigned block id (hyphenated UUID form on the wire).
    pub id: String,
    /// Block type.
    pub kind: BlockKind,
    /// Plain-text title (pages, page links, headers).
    #[serde(default)]
    pub title: String,
    /// Rich-text content spans.
    #[serde(default)]
    pub inline: Vec<InlineSpan>,
    /// Nested blocks.
    #[serde(default)]
    pub children: Vec<Block>,
    /// To-do completion flag.
    #[serde(default)]
    pub checked: bool,
    /// Inline code-block source text.
    #[serde(default)]
    pub code: String,
    /// Inline code-block language, empty for the book default.
    #[serde(default)]
    pub code_language: String,
    /// Bookmark target URL.
    #[serde(default)]
    pub link: String,
    /// External resource URL (embed, image, gist).
    #[serde(default)]
    pub source: String,
    /// Table data for collection-view blocks.
    #[serde(default)]
    pub collection: Option<CollectionView>,
}

/// One run of inline text with independent formatting flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InlineSpan {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub strikethrough: bool,
    #[serde(default)]
    pub code: bool,
    /// Link target; replaces plain-text emission.
    #[serde(default)]
    pub link: Option<String>,
    /// User mention; mutually exclusive with `link` and `date`.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Date mention; mutually exclusive with `link` and `user_id`.
    #[serde(default)]
    pub date: Option<String>,
}

/// Tabular data attached to a collection-view block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionView {
    /// Column names in display order.
    pub columns: Vec<String>,
    /// Row cells as raw provider property values, one per column.
    pub rows: Vec<Vec<Value>>,
}

/// A fetched page document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Normalized page id.
    pub id: String,
    /// Root block; must be [`BlockKind::Page`].
    pub root: Block,
    /// Render body text in a monospace font.
    #[serde(default)]
    pub mono_font: bool,
}

impl Document {
    /// Ids of directly referenced sub-pages, in block order.
    #[must_use]
    pub fn sub_page_ids(&self) -> Vec<String> {
        let mut ids = Vec::new();
        collect_sub_pages(&self.root.children, &mut ids);
        ids
    }
}

fn collect_sub_pages(blocks: &[Block], ids: &mut Vec<String>) {
    for block in blocks {
        if block.kind == BlockKind::Page {
            ids.push(normalize_id(&block.id));
        } else {
            collect_sub_pages(&block.children, ids);
        }
    }
}

/// A provider property value decoded from its nested-array wire shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderValue {
    /// Absent or empty value.
    Empty,
    /// Plain display text.
    Scalar(String),
    /// Wire shape didn't match; carries the unexpected JSON type name.
    Mismatch(&'static str),
}

impl ProviderValue {
    /// Cell display text; mismatches surface their type name inline so a
    /// bad export is visible in the generated page instead of crashing.
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Scalar(s) => s.clone(),
            Self::Mismatch(name) => format!("(unsupported value of type {name})"),
        }
    }
}

/// Decode a property value from its `[[ "text" ]]` wire shape.
///
/// The provider wraps every scalar in two array levels. Each level is
/// checked; an unexpected type at any level yields
/// [`ProviderValue::Mismatch`] with that type's name.
#[must_use]
pub fn unwrap_property(value: &Value) -> ProviderValue {
    let outer = match value {
        Value::Null => return ProviderValue::Empty,
        Value::Array(outer) => outer,
        other => return ProviderValue::Mismatch(json_type_name(other)),
    };
    let Some(first) = outer.first() else {
        return ProviderValue::Empty;
    };
    let inner = match first {
        Value::Array(inner) => inner,
        other => return ProviderValue::Mismatch(json_type_name(other)),
    };
    match inner.first() {
        None => ProviderValue::Empty,
        Some(Value::String(s)) => ProviderValue::Scalar(s.clone()),
        Some(other) => ProviderValue::Mismatch(json_type_name(other)),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Strip hyphens from a provider page id.
#[must_use]
pub fn normalize_id(id: &str) -> String {
    id.replace('-', "").to_lowercase()
}

/// Whether a string is a well-formed normalized page id: exactly 32 hex
/// characters.
#[must_use]
pub fn is_valid_page_id(id: &str) -> bool {
    id.len() == 32 && id.bytes().all(|b| b.is_ascii_hexdigit())
}
