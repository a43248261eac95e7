//! Snippet repository.
//!
//! Maps snippets onto directories of the remote store:
//!
//! ```text
//! <snippets_path>/<id>/index.md      front-matter, empty body
//! <snippets_path>/<id>/<filename>    raw file content
//! ```
//!
//! Mutations are ordered sequences of single-file writes. They are not
//! transactional: if a step fails, the error is returned and the steps that
//! already landed stay in the remote history.

use crate::codec::{decode_index, encode_index, IndexMetadata};
use crate::error::CoreResult;
use crate::model::{now, Snippet, SnippetFile, SnippetId, SnippetInput};
use crate::INDEX_FILE;
use snipvault_store::{ContentStore, DirEntry, FileContent, PathContent, StoreError};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where snippets live in the remote repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Branch every read and write targets.
    pub branch: String,
    /// Directory holding one subdirectory per snippet.
    pub snippets_path: String,
}

impl Layout {
    pub fn new(branch: impl Into<String>, snippets_path: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            snippets_path: snippets_path.into(),
        }
    }

    /// The snippets root without surrounding slashes.
    pub fn root(&self) -> &str {
        self.snippets_path.trim_matches('/')
    }

    /// Directory of one snippet.
    pub fn dir(&self, id: &SnippetId) -> String {
        match self.root() {
            "" => id.as_str().to_string(),
            root => format!("{root}/{id}"),
        }
    }

    /// Path of one file inside a snippet directory.
    pub fn file(&self, id: &SnippetId, filename: &str) -> String {
        format!("{}/{}", self.dir(id), filename)
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::new("main", "snippets")
    }
}

/// Result of a listing, including the entries that could not be resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    /// Resolved snippets, most recently updated first.
    pub snippets: Vec<Snippet>,
    /// Directory names that were skipped (missing or unreadable index, no
    /// resolvable files, or a remote failure on that entry).
    pub skipped: Vec<String>,
}

/// Snippet CRUD over a content store.
#[derive(Clone)]
pub struct SnippetRepository {
    store: Arc<dyn ContentStore>,
    layout: Layout,
}

struct IndexRead {
    meta: IndexMetadata,
    hash: String,
}

impl SnippetRepository {
    pub fn new(store: Arc<dyn ContentStore>, layout: Layout) -> Self {
        Self { store, layout }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// All resolvable snippets, most recently updated first.
    pub async fn list(&self) -> CoreResult<Vec<Snippet>> {
        Ok(self.list_report().await?.snippets)
    }

    /// List snippets and report which directories were skipped.
    pub async fn list_report(&self) -> CoreResult<Listing> {
        let root = self.layout.root();
        let entries = match self.store.read_path(root, &self.layout.branch).await {
            Ok(PathContent::Directory(entries)) => entries,
            Ok(PathContent::File(_)) => {
                warn!(root, "Snippets root is a file, not a directory");
                return Ok(Listing::default());
            }
            Err(StoreError::NotFound(_)) => {
                debug!(root, "Snippets root does not exist yet");
                return Ok(Listing::default());
            }
            Err(e) => return Err(e.into()),
        };

        let mut listing = Listing::default();
        for entry in entries.into_iter().filter(DirEntry::is_dir) {
            let id = SnippetId::from_string(entry.name);
            match self.get(&id).await {
                Ok(Some(snippet)) => listing.snippets.push(snippet),
                Ok(None) => {
                    warn!(id = %id, "Skipping snippet without a readable index or files");
                    listing.skipped.push(id.0);
                }
                Err(e) => {
                    warn!(id = %id, error = %e, "Skipping snippet that failed to load");
                    listing.skipped.push(id.0);
                }
            }
        }

        listing
            .snippets
            .sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(listing)
    }

    /// Load a snippet, or `None` if it does not exist or cannot be decoded.
    ///
    /// Files declared in the index but missing on disk are omitted; a snippet
    /// with no resolvable file is treated as absent.
    pub async fn get(&self, id: &SnippetId) -> CoreResult<Option<Snippet>> {
        if !id.is_path_safe() {
            return Ok(None);
        }
        let Some(entries) = self.read_dir(id).await? else {
            return Ok(None);
        };
        let Some(index) = self.read_index(id, &entries).await? else {
            return Ok(None);
        };

        let mut files = Vec::with_capacity(index.meta.files.len());
        for declared in &index.meta.files {
            if !entries
                .iter()
                .any(|e| e.is_file() && e.name == declared.filename)
            {
                debug!(id = %id, file = %declared.filename, "Declared file missing on disk");
                continue;
            }
            let path = self.layout.file(id, &declared.filename);
            match self.read_file(&path).await? {
                Some(content) => files.push(SnippetFile {
                    filename: declared.filename.clone(),
                    language: declared.language.clone(),
                    code: content.text(),
                }),
                None => debug!(id = %id, file = %declared.filename, "Declared file vanished"),
            }
        }

        if files.is_empty() {
            debug!(id = %id, "Snippet has no resolvable files");
            return Ok(None);
        }
        Ok(Some(index.meta.into_snippet(
            id.clone(),
            files,
            Some(index.hash),
        )))
    }

    /// Create a snippet: the index first, then each file in input order.
    pub async fn create(&self, input: &SnippetInput) -> CoreResult<Snippet> {
        input.validate()?;
        let id = SnippetId::new();
        let timestamp = now();
        let meta = IndexMetadata::from_input(input, timestamp, timestamp);
        let branch = &self.layout.branch;

        let index_hash = self
            .store
            .write_file(
                &self.layout.file(&id, INDEX_FILE),
                encode_index(&meta)?.as_bytes(),
                &format!("Create snippet: {}", input.title),
                branch,
                None,
            )
            .await?;

        for file in &input.files {
            self.store
                .write_file(
                    &self.layout.file(&id, &file.filename),
                    file.code.as_bytes(),
                    &format!("Add file: {}", file.filename),
                    branch,
                    None,
                )
                .await?;
        }

        info!(id = %id, title = %input.title, files = input.files.len(), "Created snippet");
        let files = input.files.iter().map(|f| f.to_file()).collect();
        Ok(meta.into_snippet(id, files, Some(index_hash)))
    }

    /// Replace a snippet's metadata and file set.
    ///
    /// Returns `None` if the snippet or its index cannot be read. When
    /// `expected_version` is given it is the precondition for the index write,
    /// so an edit based on a stale read fails with a conflict.
    ///
    /// Steps: write the index, write every input file (with the existing hash
    /// when the file already exists), then delete files absent from the input.
    pub async fn update(
        &self,
        id: &SnippetId,
        input: &SnippetInput,
        expected_version: Option<&str>,
    ) -> CoreResult<Option<Snippet>> {
        input.validate()?;
        if !id.is_path_safe() {
            return Ok(None);
        }
        let Some(entries) = self.read_dir(id).await? else {
            return Ok(None);
        };
        let Some(existing) = self.read_index(id, &entries).await? else {
            return Ok(None);
        };

        let meta = IndexMetadata::from_input(input, existing.meta.created_at, now())
            .with_created_from(&existing.meta);
        let branch = &self.layout.branch;
        let precondition = expected_version.unwrap_or(existing.hash.as_str());

        let index_hash = self
            .store
            .write_file(
                &self.layout.file(id, INDEX_FILE),
                encode_index(&meta)?.as_bytes(),
                &format!("Update snippet: {}", input.title),
                branch,
                Some(precondition),
            )
            .await?;

        for file in &input.files {
            let current = entries
                .iter()
                .find(|e| e.is_file() && e.name == file.filename);
            let message = match current {
                Some(_) => format!("Update file: {}", file.filename),
                None => format!("Add file: {}", file.filename),
            };
            self.store
                .write_file(
                    &self.layout.file(id, &file.filename),
                    file.code.as_bytes(),
                    &message,
                    branch,
                    current.map(|e| e.hash.as_str()),
                )
                .await?;
        }

        for stale in entries.iter().filter(|e| {
            e.is_file()
                && e.name != INDEX_FILE
                && !input.files.iter().any(|f| f.filename == e.name)
        }) {
            self.store
                .delete_file(
                    &self.layout.file(id, &stale.name),
                    &format!("Delete file: {}", stale.name),
                    &stale.hash,
                    branch,
                )
                .await?;
        }

        info!(id = %id, title = %input.title, files = input.files.len(), "Updated snippet");
        let files = input.files.iter().map(|f| f.to_file()).collect();
        Ok(Some(meta.into_snippet(id.clone(), files, Some(index_hash))))
    }

    /// Delete every file of a snippet, the index first.
    ///
    /// Returns `false` if the snippet directory cannot be listed.
    pub async fn delete(&self, id: &SnippetId) -> CoreResult<bool> {
        if !id.is_path_safe() {
            return Ok(false);
        }
        let Some(mut entries) = self.read_dir(id).await? else {
            return Ok(false);
        };
        entries.retain(DirEntry::is_file);
        entries.sort_by_key(|e| e.name != INDEX_FILE);

        let branch = &self.layout.branch;
        for entry in &entries {
            let message = if entry.name == INDEX_FILE {
                format!("Delete snippet: {id}")
            } else {
                format!("Delete file: {}", entry.name)
            };
            self.store
                .delete_file(
                    &self.layout.file(id, &entry.name),
                    &message,
                    &entry.hash,
                    branch,
                )
                .await?;
        }

        info!(id = %id, files = entries.len(), "Deleted snippet");
        Ok(true)
    }

    async fn read_dir(&self, id: &SnippetId) -> CoreResult<Option<Vec<DirEntry>>> {
        match self
            .store
            .read_path(&self.layout.dir(id), &self.layout.branch)
            .await
        {
            Ok(PathContent::Directory(entries)) => Ok(Some(entries)),
            Ok(PathContent::File(_)) => Ok(None),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_file(&self, path: &str) -> CoreResult<Option<FileContent>> {
        match self.store.read_path(path, &self.layout.branch).await {
            Ok(PathContent::File(file)) => Ok(Some(file)),
            Ok(PathContent::Directory(_)) => Ok(None),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_index(
        &self,
        id: &SnippetId,
        entries: &[DirEntry],
    ) -> CoreResult<Option<IndexRead>> {
        if !entries.iter().any(|e| e.is_file() && e.name == INDEX_FILE) {
            debug!(id = %id, "Snippet directory has no index");
            return Ok(None);
        }
        let Some(file) = self.read_file(&self.layout.file(id, INDEX_FILE)).await? else {
            return Ok(None);
        };
        match decode_index(&file.text()) {
            Ok(meta) => Ok(Some(IndexRead {
                meta,
                hash: file.hash,
            })),
            Err(e) => {
                warn!(id = %id, error = %e, "Corrupt snippet index");
                Ok(None)
            }
        }
    }
}
