//! Pre-seeded stores and store states for integration tests.
//!
//! Fixture helpers panic on failure: a broken fixture is a broken test.

use snipvault_core::{Layout, Snippet, SnippetId, Vault, INDEX_FILE};
use snipvault_store::{ContentStore, MemoryStore, PathContent};
use std::sync::Arc;

use crate::builders::SnippetInputBuilder;

/// A memory store with snippets already created through the repository.
pub struct Seeded {
    pub store: Arc<MemoryStore>,
    pub layout: Layout,
    /// Created snippets, in creation order.
    pub snippets: Vec<Snippet>,
}

impl Seeded {
    /// All operations over the seeded store.
    pub fn vault(&self) -> Vault {
        Vault::new(self.store.clone(), self.layout.clone())
    }

    /// Path of a file inside a seeded snippet.
    pub fn path(&self, id: &SnippetId, filename: &str) -> String {
        self.layout.file(id, filename)
    }
}

/// Create `n` snippets named `Snippet 0..n`, each with two files.
/// Every odd-numbered snippet is private.
pub async fn seeded_store(n: usize) -> Seeded {
    let store = Arc::new(MemoryStore::new());
    let layout = Layout::default();
    let vault = Vault::new(store.clone(), layout.clone());

    let mut snippets = Vec::with_capacity(n);
    for i in 0..n {
        let mut builder = SnippetInputBuilder::new(format!("Snippet {i}"))
            .description(format!("Seeded snippet number {i}"))
            .tag("seed")
            .file("main.rs", format!("fn main() {{ println!(\"{i}\"); }}\n"))
            .file("README.md", format!("# Snippet {i}\n"));
        if i % 2 == 1 {
            builder = builder.private();
        }
        let snippet = vault
            .snippets()
            .create(&builder.build())
            .await
            .unwrap_or_else(|e| panic!("Failed to seed snippet {i}: {e}"));
        snippets.push(snippet);
    }
    store.clear_calls();

    Seeded {
        store,
        layout,
        snippets,
    }
}

/// Current content hash of a file on the `main` branch.
pub async fn file_hash(store: &MemoryStore, path: &str) -> Option<String> {
    match store.read_path(path, "main").await {
        Ok(PathContent::File(file)) => Some(file.hash),
        _ => None,
    }
}

/// Overwrite a snippet's `index.md` with text that is not front-matter.
pub async fn corrupt_snippet(seeded: &Seeded, id: &SnippetId) {
    let path = seeded.path(id, INDEX_FILE);
    let hash = file_hash(&seeded.store, &path).await;
    seeded
        .store
        .write_file(
            &path,
            b"this is not front matter",
            "Corrupt index",
            &seeded.layout.branch,
            hash.as_deref(),
        )
        .await
        .unwrap_or_else(|e| panic!("Failed to corrupt {path}: {e}"));
}

/// Delete a snippet's `index.md`, leaving its files behind.
pub async fn remove_index(seeded: &Seeded, id: &SnippetId) {
    let path = seeded.path(id, INDEX_FILE);
    let hash = file_hash(&seeded.store, &path)
        .await
        .unwrap_or_else(|| panic!("No index at {path}"));
    seeded
        .store
        .delete_file(&path, "Remove index", &hash, &seeded.layout.branch)
        .await
        .unwrap_or_else(|e| panic!("Failed to remove {path}: {e}"));
}
