//! `bookgen build` command implementation.

use std::collections::HashSet;
use std::path::PathBuf;

use clap::Args;

use bookgen_notion::{CachePolicy, HttpPageProvider, PageCache, normalize_id};
use bookgen_site::{AssembleOptions, BookBuilder, BookSpec, assemble_book};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the build command.
#[derive(Args)]
pub(crate) struct BuildArgs {
    /// Build only the book with this directory name.
    #[arg(short, long)]
    book: Option<String>,

    /// Content API base URL.
    #[arg(long, env = "BOOKGEN_API_BASE", default_value = "https://api.programming-books.io")]
    api_base: String,

    /// Checkout of the books repository that embeds resolve against.
    #[arg(long, default_value = ".")]
    source_dir: PathBuf,

    /// Cache directory (fetched pages, snippet output shards).
    #[arg(long, default_value = "cache")]
    cache_dir: PathBuf,

    /// Output directory for the generated site.
    #[arg(short, long, default_value = "www")]
    out_dir: PathBuf,

    /// Analytics id injected into every page.
    #[arg(long)]
    analytics: Option<String>,

    /// Refetch every page instead of using cached copies.
    #[arg(long)]
    no_cache: bool,

    /// Refetch a single page by id (repeatable).
    #[arg(long, value_name = "ID")]
    redownload_page: Vec<String>,

    /// Re-execute every snippet instead of trusting cached output.
    #[arg(long)]
    update_output: bool,

    /// Throw the snippet output cache away and rebuild it.
    #[arg(long)]
    recreate_output: bool,

    /// Submit snippets without a cached playground share id.
    #[arg(long)]
    submit_playground: bool,

    /// Rebuild on demand instead of exiting after one build.
    #[arg(long)]
    pub preview: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl BuildArgs {
    /// Execute the build command.
    ///
    /// # Errors
    ///
    /// Returns an error when fetching, snippet execution or site assembly
    /// fails for any selected book.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let selected: Vec<BookSpec> = books()
            .into_iter()
            .filter(|b| self.book.as_ref().is_none_or(|dir| *dir == b.dir))
            .collect();
        if selected.is_empty() {
            let known: Vec<String> = books().into_iter().map(|b| b.dir).collect();
            return Err(CliError::Validation(format!(
                "unknown book, known books: {}",
                known.join(", ")
            )));
        }

        let provider = HttpPageProvider::new(&self.api_base);
        let page_cache = PageCache::new(&self.cache_dir.join("pages"))?;
        let policy = CachePolicy {
            use_cache: !self.no_cache,
            refresh: self
                .redownload_page
                .iter()
                .map(|id| normalize_id(id))
                .collect::<HashSet<_>>(),
        };
        let assemble = AssembleOptions {
            out_dir: self.out_dir.clone(),
            analytics: self.analytics.clone(),
        };

        loop {
            for spec in &selected {
                output.highlight(&format!("Building {}", spec.title));
                let mut builder =
                    BookBuilder::new(&provider, &page_cache, &self.source_dir, &self.cache_dir)
                        .cache_policy(policy.clone());
                if self.update_output {
                    builder = builder.update_output();
                }
                if self.recreate_output {
                    builder = builder.recreate_output();
                }
                if self.submit_playground {
                    builder = builder.submit_playground();
                }
                let book = builder.build(spec)?;
                assemble_book(&book, &assemble)?;
                output.success(&format!(
                    "{}: {} pages -> {}",
                    spec.title,
                    book.tree.nodes.len(),
                    self.out_dir.join("essential").join(&spec.dir).display()
                ));
            }
            if !self.preview {
                break;
            }
            output.info("Press Enter to rebuild, q to quit");
            let line = console::Term::stdout().read_line()?;
            if line.trim() == "q" {
                break;
            }
        }
        Ok(())
    }
}

/// All published books. Root page ids come from the content workspace.
fn books() -> Vec<BookSpec> {
    fn book(title: &str, dir: &str, root_page_id: &str, default_lang: &str) -> BookSpec {
        BookSpec {
            title: title.to_string(),
            dir: dir.to_string(),
            root_page_id: root_page_id.to_string(),
            default_lang: default_lang.to_string(),
        }
    }
    vec![
        book(
            "Essential Go",
            "go",
            "6fd822264cbe4b28b667ef508d6ff4e4",
            "go",
        ),
        book(
            "Essential Javascript",
            "javascript",
            "c581b181ffe04fbaa2c2c8e18b2a82e7",
            "js",
        ),
        book(
            "Essential Python",
            "python",
            "4af64f3b5cb44ac5adfcea6ba2344f1c",
            "python",
        ),
    ]
}
