//! Core snippet logic for snipvault.
//!
//! Snippets are small multi-file projects stored as directories in a remote
//! version-controlled repository, which doubles as the database, the change
//! log and the diff engine. This crate provides:
//! - The snippet model and input validation
//! - The `index.md` front-matter codec and language inference
//! - Snippet CRUD with ordered, non-transactional remote writes
//! - Revision history, historical snapshots and per-commit diffs
//! - Configuration, the allow-list access policy and search documents
//!
//! # Example
//!
//! ```no_run
//! use snipvault_core::{FileInput, Layout, SnippetInput, Vault};
//! use snipvault_store::MemoryStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let vault = Vault::new(Arc::new(MemoryStore::new()), Layout::default());
//!
//! let snippet = vault
//!     .snippets()
//!     .create(&SnippetInput {
//!         title: "Hello".to_string(),
//!         description: String::new(),
//!         tags: vec!["demo".to_string()],
//!         is_public: true,
//!         files: vec![FileInput::new("main.rs", "fn main() {}")],
//!     })
//!     .await?;
//!
//! let revisions = vault.history().list_revisions(&snippet.id, 50).await?;
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod codec;
pub mod config;
pub mod error;
pub mod history;
pub mod model;
pub mod patch;
pub mod repository;
pub mod revision;
pub mod search;

pub use access::AccessPolicy;
pub use codec::{decode_index, encode_index, infer_language, IndexFile, IndexMetadata};
pub use config::Config;
pub use error::{CodecError, CodecResult, ConfigError, CoreError, CoreResult};
pub use history::{HistoryReader, MAX_REVISIONS};
pub use model::{
    Diff, FileInput, Revision, RevisionKind, RevisionStats, Snippet, SnippetFile, SnippetId,
    SnippetInput,
};
pub use patch::{parse_patch, LineKind, PatchLine};
pub use repository::{Layout, Listing, SnippetRepository};
pub use revision::RevisionReader;
pub use search::{render_document, render_public, SearchDocument};

use snipvault_store::ContentStore;
use std::sync::Arc;

/// Name of the metadata file in every snippet directory.
pub const INDEX_FILE: &str = "index.md";

/// All snippet operations over one store connection.
#[derive(Clone)]
pub struct Vault {
    snippets: SnippetRepository,
    history: HistoryReader,
    revisions: RevisionReader,
}

impl Vault {
    pub fn new(store: Arc<dyn ContentStore>, layout: Layout) -> Self {
        Self {
            snippets: SnippetRepository::new(store.clone(), layout.clone()),
            history: HistoryReader::new(store.clone(), layout.clone()),
            revisions: RevisionReader::new(store, layout),
        }
    }

    pub fn snippets(&self) -> &SnippetRepository {
        &self.snippets
    }

    pub fn history(&self) -> &HistoryReader {
        &self.history
    }

    pub fn revisions(&self) -> &RevisionReader {
        &self.revisions
    }

    pub fn layout(&self) -> &Layout {
        self.snippets.layout()
    }
}
