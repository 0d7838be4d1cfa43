//! Page tree building: meta-block extraction and sub-page recursion.

use std::collections::{BTreeMap, HashMap, HashSet};

use bookgen_notion::{Block, BlockKind, Document, normalize_id};
use bookgen_render::urlify;
use bookgen_snippets::SourceFile;
use tracing::warn;

use crate::error::BuildError;

/// One page of a built book.
#[derive(Debug)]
pub struct Page {
    /// Normalized provider page id.
    pub id: String,
    pub title: String,
    pub doc: Document,
    /// Filtered content blocks: meta and sub-page blocks removed.
    pub blocks: Vec<Block>,
    /// Stable short id from a `$id` meta block, used in the page URL.
    pub meta_id: Option<String>,
    /// Cross-reference id from a `$stack-overflow-id` meta block.
    pub stack_overflow_id: Option<String>,
    /// Search keywords from a `$search` meta block.
    pub search: Vec<String>,
    /// Arena index of the parent, `None` for the root.
    pub parent: Option<usize>,
    /// Arena indices of child pages, in block order.
    pub children: Vec<usize>,
    /// Source-file embeds keyed by original locator; attached by the book
    /// build after tree construction.
    pub embeds: BTreeMap<String, PageEmbed>,
}

/// A resolved, loaded and executed source-file embed.
#[derive(Debug)]
pub struct PageEmbed {
    pub file: SourceFile,
    /// Source link for the code-box nav: the unwrapped GitHub URL, or the
    /// sandbox project URL for sandbox embeds.
    pub github_url: String,
}

impl Page {
    /// The id segment used in this page's URL.
    #[must_use]
    pub fn url_id(&self) -> &str {
        self.meta_id.as_deref().unwrap_or(&self.id)
    }
}

/// Canonical URL of a page within a book.
#[must_use]
pub fn page_url(book_dir: &str, page: &Page) -> String {
    format!(
        "/essential/{book_dir}/{}-{}",
        page.url_id(),
        urlify(&page.title)
    )
}

/// A book's pages as an index-linked arena; node 0 is the root, and the
/// vector order is depth-first pre-order (the reading order).
#[derive(Debug)]
pub struct PageTree {
    pub nodes: Vec<Page>,
}

impl PageTree {
    pub const ROOT: usize = 0;

    /// Build the tree for `root_id` from a fetched document graph.
    ///
    /// # Errors
    ///
    /// [`BuildError::Structural`] when the root isn't a page, a sub-page
    /// block has no fetched document, or a meta block carries an unknown
    /// key.
    pub fn build(
        root_id: &str,
        docs: &HashMap<String, Document>,
    ) -> Result<Self, BuildError> {
        let root_id = normalize_id(root_id);
        let mut nodes = Vec::new();
        let mut visited = HashSet::from([root_id.clone()]);
        build_node(&root_id, None, docs, &mut nodes, &mut visited)?;
        Ok(Self { nodes })
    }

    /// Map from normalized page id to arena index. Pages reachable under a
    /// `$id` meta id are indexed under that too.
    #[must_use]
    pub fn index_by_id(&self) -> HashMap<String, usize> {
        let mut index = HashMap::new();
        for (i, page) in self.nodes.iter().enumerate() {
            index.insert(page.id.clone(), i);
            if let Some(meta_id) = &page.meta_id {
                index.insert(meta_id.clone(), i);
            }
        }
        index
    }
}

fn build_node(
    id: &str,
    parent: Option<usize>,
    docs: &HashMap<String, Document>,
    nodes: &mut Vec<Page>,
    visited: &mut HashSet<String>,
) -> Result<usize, BuildError> {
    let doc = docs.get(id).ok_or_else(|| {
        BuildError::Structural(format!("sub-page '{id}' has no fetched document"))
    })?;
    if doc.root.kind != BlockKind::Page {
        return Err(BuildError::Structural(format!(
            "document '{id}' root is {:?}, expected a page",
            doc.root.kind
        )));
    }

    let mut page = Page {
        id: id.to_string(),
        title: doc.root.title.clone(),
        doc: doc.clone(),
        blocks: Vec::new(),
        meta_id: None,
        stack_overflow_id: None,
        search: Vec::new(),
        parent,
        children: Vec::new(),
        embeds: BTreeMap::new(),
    };

    let mut sub_ids = Vec::new();
    for block in &doc.root.children {
        if block.kind == BlockKind::Page {
            sub_ids.push(normalize_id(&block.id));
            continue;
        }
        if let Some((key, value)) = meta_line(block) {
            apply_meta(&mut page, id, &key, &value)?;
            continue;
        }
        page.blocks.push(block.clone());
    }

    let idx = nodes.len();
    nodes.push(page);

    for sub_id in sub_ids {
        if !visited.insert(sub_id.clone()) {
            warn!(id = %sub_id, "page referenced more than once, keeping first placement");
            continue;
        }
        let child = build_node(&sub_id, Some(idx), docs, nodes, visited)?;
        nodes[idx].children.push(child);
    }
    Ok(idx)
}

/// Recognize a meta block: a text block with exactly one unstyled span whose
/// trimmed content is `$key: value`. Styled or colon-less `$` paragraphs are
/// ordinary prose and stay in the content.
fn meta_line(block: &Block) -> Option<(String, String)> {
    if block.kind != BlockKind::Text {
        return None;
    }
    let [span] = block.inline.as_slice() else {
        return None;
    };
    if span.bold
        || span.italic
        || span.strikethrough
        || span.code
        || span.link.is_some()
        || span.user_id.is_some()
        || span.date.is_some()
    {
        return None;
    }
    let rest = span.text.trim().strip_prefix('$')?;
    let (key, value) = rest.split_once(':')?;
    Some((key.trim().to_string(), value.trim().to_string()))
}

fn apply_meta(page: &mut Page, id: &str, key: &str, value: &str) -> Result<(), BuildError> {
    match key {
        "id" => page.meta_id = Some(value.to_string()),
        "stack-overflow-id" => page.stack_overflow_id = Some(value.to_string()),
        "search" => {
            page.search = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
                .collect();
        }
        // recognized but unused
        "score" => {}
        _ => {
            return Err(BuildError::Structural(format!(
                "page '{id}': unknown meta key '${key}'"
            )));
        }
    }
    Ok(())
}
