//! Historical snapshots and per-commit diffs.

use crate::codec::{decode_index, infer_language};
use crate::error::CoreResult;
use crate::model::{Diff, Snippet, SnippetFile, SnippetId};
use crate::repository::Layout;
use crate::INDEX_FILE;
use snipvault_store::{ContentStore, FileStatus, StoreError, TreeEntryKind};
use std::sync::Arc;
use tracing::{debug, warn};

/// Rebuilds snippets as they were at a given commit.
#[derive(Clone)]
pub struct RevisionReader {
    store: Arc<dyn ContentStore>,
    layout: Layout,
}

impl RevisionReader {
    pub fn new(store: Arc<dyn ContentStore>, layout: Layout) -> Self {
        Self { store, layout }
    }

    /// The snippet's files and metadata at commit `sha`.
    ///
    /// Walks the commit's tree and fetches one blob per file directly under
    /// the snippet directory. Languages are recomputed from the filenames.
    /// Files keep the order the index declares; undeclared files follow by
    /// name. Returns `None` when the commit is unknown or has no index for
    /// the snippet.
    pub async fn get_snapshot(&self, id: &SnippetId, sha: &str) -> CoreResult<Option<Snippet>> {
        if !id.is_path_safe() {
            return Ok(None);
        }
        let tree = match self.store.tree_recursive(sha).await {
            Ok(tree) => tree,
            Err(StoreError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let prefix = format!("{}/", self.layout.dir(id));
        let mut index_blob = None;
        let mut blobs = Vec::new();
        for entry in tree {
            if entry.kind != TreeEntryKind::Blob {
                continue;
            }
            let Some(name) = entry.path.strip_prefix(&prefix) else {
                continue;
            };
            if name.contains('/') {
                continue;
            }
            if name == INDEX_FILE {
                index_blob = Some(entry.id);
            } else {
                blobs.push((name.to_string(), entry.id));
            }
        }

        let Some(index_blob) = index_blob else {
            debug!(id = %id, sha, "No index at this commit");
            return Ok(None);
        };
        let index_text = String::from_utf8_lossy(&self.store.blob(&index_blob).await?).into_owned();
        let meta = match decode_index(&index_text) {
            Ok(meta) => meta,
            Err(e) => {
                warn!(id = %id, sha, error = %e, "Corrupt index at this commit");
                return Ok(None);
            }
        };

        blobs.sort_by(|(a, _), (b, _)| {
            let rank = |name: &str| meta.files.iter().position(|f| f.filename == name);
            match (rank(a), rank(b)) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => a.cmp(b),
            }
        });

        let mut files = Vec::with_capacity(blobs.len());
        for (filename, blob_id) in blobs {
            let bytes = self.store.blob(&blob_id).await?;
            files.push(SnippetFile {
                language: infer_language(&filename).to_string(),
                code: String::from_utf8_lossy(&bytes).into_owned(),
                filename,
            });
        }

        debug!(id = %id, sha, files = files.len(), "Reconstructed snapshot");
        Ok(Some(meta.into_snippet(id.clone(), files, None)))
    }

    /// Per-file changes of commit `sha` relative to its first parent.
    ///
    /// File records are returned as the store reports them, across the whole
    /// repository; use [`Diff::scoped_to`] to restrict them to the snippet.
    /// A root commit yields `parent_sha == ""` with every file marked added.
    /// Returns `None` when the commit does not exist.
    pub async fn get_diff(&self, id: &SnippetId, sha: &str) -> CoreResult<Option<Diff>> {
        let detail = match self.store.commit_detail(sha).await {
            Ok(detail) => detail,
            Err(StoreError::NotFound(_)) => {
                debug!(id = %id, sha, "Commit not found");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let parent_sha = detail.parents.into_iter().next().unwrap_or_default();
        let mut files = detail.files;
        if parent_sha.is_empty() {
            for file in &mut files {
                file.status = FileStatus::Added;
                file.previous_filename = None;
            }
        }

        Ok(Some(Diff {
            sha: detail.sha,
            parent_sha,
            files,
        }))
    }
}
