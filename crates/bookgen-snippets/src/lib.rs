//! Snippet pipeline for embedded source files.
//!
//! Book pages embed source files from a repository checkout. This crate
//! turns such a file into everything a rendered code box needs:
//!
//! 1. [`directive`] parses the optional rendering directive on the first
//!    line (`// no output, allow error, line 10`).
//! 2. [`show`] extracts `// :show start` / `// :show end` display regions
//!    and an embedded `:run` command.
//! 3. [`source_file`] ties the above together into a [`SourceFile`] with a
//!    content hash over the filtered lines.
//! 4. [`exec`] runs the snippet and captures combined output, consulting the
//!    sharded [`output_cache`] so unchanged snippets never re-run.
//! 5. [`playground`] and [`sandbox`] cache the external service lookups
//!    (share ids and multi-file archives).

pub mod directive;
mod error;
pub mod exec;
pub mod output_cache;
pub mod playground;
pub mod sandbox;
pub mod show;
pub mod source_file;

pub use directive::{FileDirective, parse_directive};
pub use error::SnippetError;
pub use exec::{OutputPolicy, capture_output, execute_snippet};
pub use output_cache::{MAX_SHARD_SIZE, OutputStore, content_hash};
pub use playground::PlaygroundCache;
pub use sandbox::SandboxCache;
pub use source_file::SourceFile;
