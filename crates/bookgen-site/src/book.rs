//! Book construction: page graph to tree, embeds loaded and executed.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use bookgen_notion::{Block, BlockKind, CachePolicy, PageCache, PageProvider, load_page_graph};
use bookgen_snippets::{
    OutputPolicy, OutputStore, PlaygroundCache, SandboxCache, SourceFile, capture_output,
};
use tracing::{info, warn};

use crate::embeds::{is_sandbox_source, resolve_embed_source};
use crate::error::BuildError;
use crate::page::{Page, PageEmbed, PageTree, page_url};

/// Playground share endpoint for submitting snippets.
const PLAYGROUND_SHARE_URL: &str = "https://play.golang.org/share";
/// Languages that get a "try online" link.
const PLAYGROUND_LANGS: &[&str] = &["go"];

/// Identity of one book.
#[derive(Debug, Clone)]
pub struct BookSpec {
    pub title: String,
    /// Directory segment in page URLs (`/essential/{dir}/...`).
    pub dir: String,
    /// Provider id of the book's root page.
    pub root_page_id: String,
    /// Highlight language for inline code blocks without one.
    pub default_lang: String,
}

/// Everything needed to build books: provider, caches and policies.
pub struct BookBuilder<'a> {
    provider: &'a dyn PageProvider,
    page_cache: &'a PageCache,
    cache_policy: CachePolicy,
    /// Checkout of the books repository that embed paths resolve against.
    source_root: PathBuf,
    /// Directory holding per-book output-cache shards and id caches.
    cache_root: PathBuf,
    output_policy: OutputPolicy,
    recreate_output: bool,
    submit_playground: bool,
}

impl<'a> BookBuilder<'a> {
    pub fn new(
        provider: &'a dyn PageProvider,
        page_cache: &'a PageCache,
        source_root: &Path,
        cache_root: &Path,
    ) -> Self {
        Self {
            provider,
            page_cache,
            cache_policy: CachePolicy::cached(),
            source_root: source_root.to_path_buf(),
            cache_root: cache_root.to_path_buf(),
            output_policy: OutputPolicy::UseCache,
            recreate_output: false,
            submit_playground: false,
        }
    }

    #[must_use]
    pub fn cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = policy;
        self
    }

    /// Re-execute every snippet instead of trusting cached output.
    #[must_use]
    pub fn update_output(mut self) -> Self {
        self.output_policy = OutputPolicy::Rerun;
        self
    }

    /// Throw the output cache away and rebuild it from scratch.
    #[must_use]
    pub fn recreate_output(mut self) -> Self {
        self.recreate_output = true;
        self
    }

    /// Submit snippets without a cached playground share id.
    #[must_use]
    pub fn submit_playground(mut self) -> Self {
        self.submit_playground = true;
        self
    }

    /// Build one book: fetch its page graph, build the tree, load and
    /// execute embeds, and flush the output cache.
    ///
    /// # Errors
    ///
    /// Fetch, structural, snippet and I/O failures are all fatal.
    pub fn build(&self, spec: &BookSpec) -> Result<Book, BuildError> {
        info!(book = %spec.title, "building book");
        let docs = load_page_graph(
            self.provider,
            self.page_cache,
            &spec.root_page_id,
            &self.cache_policy,
        )?;
        let mut tree = PageTree::build(&spec.root_page_id, &docs)?;

        let output_dir = self.cache_root.join(&spec.dir);
        let mut store = if self.recreate_output {
            OutputStore::recreate(&output_dir)?
        } else {
            OutputStore::load(&output_dir)?
        };
        let mut playground = PlaygroundCache::load(
            &output_dir.join("playground_ids.txt"),
            PLAYGROUND_SHARE_URL,
        )?;
        let mut sandbox = SandboxCache::load(&output_dir.join("sandbox_projects.txt"))?;

        let mut playground_ids = HashMap::new();
        for page in &mut tree.nodes {
            self.attach_embeds(
                page,
                &mut store,
                &mut playground,
                &mut sandbox,
                &mut playground_ids,
            )?;
        }
        store.flush()?;

        let index = tree.index_by_id();
        Ok(Book {
            spec: spec.clone(),
            tree,
            index,
            playground_ids,
        })
    }

    fn attach_embeds(
        &self,
        page: &mut Page,
        store: &mut OutputStore,
        playground: &mut PlaygroundCache,
        sandbox: &mut SandboxCache,
        playground_ids: &mut HashMap<String, String>,
    ) -> Result<(), BuildError> {
        for url in collect_embed_urls(&page.blocks) {
            if is_sandbox_source(&url) {
                self.attach_sandbox_embed(page, &url, sandbox, store)?;
                continue;
            }
            let Some(source) = resolve_embed_source(&url) else {
                continue;
            };
            let path = self.source_root.join(&source.repo_path);
            if !path.exists() {
                warn!(path = %path.display(), "embed file missing, skipping");
                continue;
            }
            let mut file = SourceFile::load(&path, &url)?;
            capture_output(&mut file, store, self.output_policy)?;

            if PLAYGROUND_LANGS.contains(&file.lang.as_str()) && !file.directive.no_playground {
                let id = if self.submit_playground {
                    match playground.get_or_submit(&file.sha, &file.lines.join("\n")) {
                        Ok(id) => Some(id),
                        Err(e) => {
                            warn!(file = %file.file_name, error = %e, "playground submit failed");
                            None
                        }
                    }
                } else {
                    playground.get(&file.sha).map(ToString::to_string)
                };
                if let Some(id) = id {
                    playground_ids.insert(file.sha.clone(), id);
                }
            }

            page.embeds.insert(
                url,
                PageEmbed {
                    file,
                    github_url: source.github_url,
                },
            );
        }
        Ok(())
    }

    /// Build an embed from a sandbox project: fetch its files (cached),
    /// unpack them into a scratch directory and execute the `main.*` file.
    fn attach_sandbox_embed(
        &self,
        page: &mut Page,
        url: &str,
        sandbox: &mut SandboxCache,
        store: &mut OutputStore,
    ) -> Result<(), BuildError> {
        let files = match sandbox.get_or_fetch(url) {
            Ok(files) => files.clone(),
            Err(e) => {
                warn!(url, error = %e, "sandbox download failed, skipping embed");
                return Ok(());
            }
        };
        let Some(main) = files
            .keys()
            .find(|name| Path::new(name).file_stem().and_then(|s| s.to_str()) == Some("main"))
        else {
            warn!(url, "sandbox project has no main file, skipping embed");
            return Ok(());
        };

        let workdir = tempfile::tempdir()?;
        for (name, content) in &files {
            let path = workdir.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, content)?;
        }

        let mut file = SourceFile::load(&workdir.path().join(main), url)?;
        capture_output(&mut file, store, self.output_policy)?;
        page.embeds.insert(
            url.to_string(),
            PageEmbed {
                file,
                github_url: url.to_string(),
            },
        );
        Ok(())
    }
}

/// A fully built book, ready to render.
#[derive(Debug)]
pub struct Book {
    pub spec: BookSpec,
    pub tree: PageTree,
    /// Normalized id (and meta id) to arena index.
    pub index: HashMap<String, usize>,
    /// Snippet content hash to playground share id.
    playground_ids: HashMap<String, String>,
}

impl Book {
    /// Canonical URL of a page by arena index.
    #[must_use]
    pub fn url_of(&self, idx: usize) -> String {
        page_url(&self.spec.dir, &self.tree.nodes[idx])
    }

    /// "try online" URL for a snippet, when it has a cached share id and its
    /// directive doesn't opt out.
    #[must_use]
    pub fn playground_url_for(&self, file: &SourceFile) -> Option<String> {
        if file.directive.no_playground || !PLAYGROUND_LANGS.contains(&file.lang.as_str()) {
            return None;
        }
        self.playground_ids
            .get(&file.sha)
            .map(|id| format!("https://play.golang.org/p/{id}"))
    }
}

#[cfg(test)]
impl Book {
    pub(crate) fn for_tests(
        spec: BookSpec,
        tree: PageTree,
        index: HashMap<String, usize>,
    ) -> Self {
        Self {
            spec,
            tree,
            index,
            playground_ids: HashMap::new(),
        }
    }
}

/// Embed locators in block order, depth-first, deduplicated.
fn collect_embed_urls(blocks: &[Block]) -> Vec<String> {
    fn walk(blocks: &[Block], out: &mut Vec<String>) {
        for block in blocks {
            if block.kind == BlockKind::Embed && !out.contains(&block.source) {
                out.push(block.source.clone());
            }
            walk(&block.children, out);
        }
    }
    let mut out = Vec::new();
    walk(blocks, &mut out);
    out
}
