//! Remote content store client for snipvault.
//!
//! The remote store is a version-controlled file host that acts as the
//! database: files are read and written at a branch, every write produces one
//! commit, and history, trees and blobs can be read back by object id.
//!
//! Backends:
//! - GitHub REST API ([`GitHubStore`])
//! - In-memory commit-addressed fake ([`MemoryStore`], for testing)

pub mod error;
pub mod github;
pub mod memory;
pub mod model;

pub use error::{StoreError, StoreResult};
pub use github::{GitHubConnector, GitHubSettings, GitHubStore};
pub use memory::{MemoryStore, StoreCall};
pub use model::{
    CommitDetail, CommitSummary, DirEntry, EntryKind, FileChange, FileContent, FileStatus,
    PathContent, Signature, TreeEntry, TreeEntryKind,
};

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// A narrow capability over a remote version-controlled file host.
///
/// Paths are `/`-separated and relative to the repository root. No method
/// retries; retry policy belongs to the caller.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Resolve a path at a ref to either a file or a directory listing.
    ///
    /// Fails with [`StoreError::NotFound`] when nothing exists at `path`.
    async fn read_path(&self, path: &str, reference: &str) -> StoreResult<PathContent>;

    /// Create or update a file, producing exactly one new commit.
    ///
    /// When `expected_hash` is given it must match the file's current content
    /// hash, otherwise the call fails with [`StoreError::Conflict`].
    /// Returns the new content hash.
    async fn write_file(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        branch: &str,
        expected_hash: Option<&str>,
    ) -> StoreResult<String>;

    /// Delete a file. Fails with [`StoreError::Conflict`] if `hash` is stale.
    async fn delete_file(&self, path: &str, message: &str, hash: &str, branch: &str)
        -> StoreResult<()>;

    /// Commits touching `path`, most recent first, at most `limit`.
    async fn list_history(
        &self,
        path: &str,
        reference: &str,
        limit: usize,
    ) -> StoreResult<Vec<CommitSummary>>;

    /// Parents and per-file stats/patches of a commit.
    async fn commit_detail(&self, sha: &str) -> StoreResult<CommitDetail>;

    /// Every entry reachable from a commit, flattened.
    async fn tree_recursive(&self, sha: &str) -> StoreResult<Vec<TreeEntry>>;

    /// Raw bytes of a blob.
    async fn blob(&self, id: &str) -> StoreResult<Vec<u8>>;
}

/// An opaque delegated bearer token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for building an `Authorization` header.
    pub fn token(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Binds a credential (or anonymous access) to a store handle.
///
/// Connections are cheap and made per request, so a credential never outlives
/// the operation it was supplied for.
pub trait StoreConnector: Send + Sync {
    fn connect(&self, credential: Option<&Credential>) -> Arc<dyn ContentStore>;
}

/// The memory store ignores credentials: every connection sees the same data.
impl StoreConnector for Arc<MemoryStore> {
    fn connect(&self, _credential: Option<&Credential>) -> Arc<dyn ContentStore> {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_debug_is_redacted() {
        let cred = Credential::new("gho_secret");
        assert_eq!(format!("{cred:?}"), "Credential(***)");
        assert_eq!(cred.token(), "gho_secret");
    }

    #[tokio::test]
    async fn memory_connector_shares_state() {
        let store = Arc::new(MemoryStore::new());
        let a = store.connect(None);
        let b = store.connect(Some(&Credential::new("t")));

        a.write_file("x/y.txt", b"hi", "add", "main", None)
            .await
            .unwrap();
        assert!(matches!(
            b.read_path("x/y.txt", "main").await.unwrap(),
            PathContent::File(_)
        ));
    }
}
