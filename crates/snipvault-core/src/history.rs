//! Revision history of a snippet directory.

use crate::error::CoreResult;
use crate::model::{Revision, RevisionKind, RevisionStats, SnippetId};
use crate::repository::Layout;
use snipvault_store::{CommitSummary, ContentStore, StoreError};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Most revisions fetched for one snippet.
pub const MAX_REVISIONS: usize = 50;

/// Lists the commits that touched a snippet.
#[derive(Clone)]
pub struct HistoryReader {
    store: Arc<dyn ContentStore>,
    layout: Layout,
}

impl HistoryReader {
    pub fn new(store: Arc<dyn ContentStore>, layout: Layout) -> Self {
        Self { store, layout }
    }

    /// Commits touching the snippet directory, newest first, at most
    /// `limit` (capped at [`MAX_REVISIONS`]).
    ///
    /// Each commit costs one extra detail fetch for its line stats. A detail
    /// that is not found leaves that revision's stats as `None`; any other
    /// failure is returned.
    pub async fn list_revisions(&self, id: &SnippetId, limit: usize) -> CoreResult<Vec<Revision>> {
        if !id.is_path_safe() {
            return Ok(Vec::new());
        }
        let limit = limit.min(MAX_REVISIONS);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let dir = self.layout.dir(id);
        let commits = match self
            .store
            .list_history(&dir, &self.layout.branch, limit)
            .await
        {
            Ok(commits) => commits,
            Err(StoreError::NotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        debug!(id = %id, count = commits.len(), "Fetched snippet history");

        let mut revisions = Vec::with_capacity(commits.len());
        for commit in commits.into_iter().take(limit) {
            let stats = match self.store.commit_detail(&commit.sha).await {
                Ok(detail) => Some(RevisionStats::new(detail.additions(), detail.deletions())),
                Err(StoreError::NotFound(_)) => {
                    warn!(sha = %commit.sha, "Commit detail not found, omitting stats");
                    None
                }
                Err(e) => {
                    error!(sha = %commit.sha, error = %e, "Failed to fetch commit stats");
                    return Err(e.into());
                }
            };
            revisions.push(revision(commit, stats));
        }
        Ok(revisions)
    }
}

fn revision(commit: CommitSummary, stats: Option<RevisionStats>) -> Revision {
    Revision {
        kind: RevisionKind::classify(&commit.message),
        sha: commit.sha,
        message: commit.message,
        author: commit.author,
        committer: commit.committer,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FileInput, SnippetInput};
    use crate::repository::SnippetRepository;
    use crate::CoreError;
    use async_trait::async_trait;
    use snipvault_store::{CommitDetail, MemoryStore, PathContent, StoreResult, TreeEntry};

    /// Delegates to a memory store but fails every commit detail fetch.
    struct DetailFailure {
        inner: Arc<MemoryStore>,
        error: fn(&str) -> StoreError,
    }

    #[async_trait]
    impl ContentStore for DetailFailure {
        async fn read_path(&self, path: &str, reference: &str) -> StoreResult<PathContent> {
            self.inner.read_path(path, reference).await
        }

        async fn write_file(
            &self,
            path: &str,
            content: &[u8],
            message: &str,
            branch: &str,
            expected_hash: Option<&str>,
        ) -> StoreResult<String> {
            self.inner
                .write_file(path, content, message, branch, expected_hash)
                .await
        }

        async fn delete_file(
            &self,
            path: &str,
            message: &str,
            hash: &str,
            branch: &str,
        ) -> StoreResult<()> {
            self.inner.delete_file(path, message, hash, branch).await
        }

        async fn list_history(
            &self,
            path: &str,
            reference: &str,
            limit: usize,
        ) -> StoreResult<Vec<CommitSummary>> {
            self.inner.list_history(path, reference, limit).await
        }

        async fn commit_detail(&self, sha: &str) -> StoreResult<CommitDetail> {
            Err((self.error)(sha))
        }

        async fn tree_recursive(&self, sha: &str) -> StoreResult<Vec<TreeEntry>> {
            self.inner.tree_recursive(sha).await
        }

        async fn blob(&self, id: &str) -> StoreResult<Vec<u8>> {
            self.inner.blob(id).await
        }
    }

    async fn history_with_failing_details(
        error: fn(&str) -> StoreError,
    ) -> (HistoryReader, SnippetId) {
        let store = Arc::new(MemoryStore::new());
        let repo = SnippetRepository::new(store.clone(), Layout::default());
        let created = repo.create(&input("v1", "a\n")).await.unwrap();
        let failing = Arc::new(DetailFailure {
            inner: store,
            error,
        });
        (HistoryReader::new(failing, Layout::default()), created.id)
    }

    fn input(title: &str, code: &str) -> SnippetInput {
        SnippetInput {
            title: title.to_string(),
            description: String::new(),
            tags: vec![],
            is_public: true,
            files: vec![FileInput::new("main.py", code)],
        }
    }

    #[tokio::test]
    async fn test_revisions_newest_first_with_stats() {
        let store = Arc::new(MemoryStore::new());
        let repo = SnippetRepository::new(store.clone(), Layout::default());
        let history = HistoryReader::new(store.clone(), Layout::default());

        let created = repo.create(&input("v1", "a\nb\n")).await.unwrap();
        repo.update(&created.id, &input("v2", "a\nc\nd\n"), None)
            .await
            .unwrap();

        let revisions = history.list_revisions(&created.id, 50).await.unwrap();
        let messages: Vec<_> = revisions.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Update file: main.py",
                "Update snippet: v2",
                "Add file: main.py",
                "Create snippet: v1",
            ]
        );
        assert_eq!(revisions[0].kind, RevisionKind::Update);
        assert_eq!(revisions[2].kind, RevisionKind::Add);
        assert_eq!(revisions[3].kind, RevisionKind::Create);

        let file_update = revisions[0].stats.unwrap();
        assert_eq!(file_update.additions, 2);
        assert_eq!(file_update.deletions, 1);
        assert_eq!(file_update.total, 3);
    }

    #[tokio::test]
    async fn test_limit_is_capped() {
        let store = Arc::new(MemoryStore::new());
        let repo = SnippetRepository::new(store.clone(), Layout::default());
        let history = HistoryReader::new(store.clone(), Layout::default());

        let created = repo.create(&input("v", "0")).await.unwrap();
        for i in 0..30 {
            repo.update(&created.id, &input("v", &i.to_string()), None)
                .await
                .unwrap();
        }

        assert_eq!(history.list_revisions(&created.id, 3).await.unwrap().len(), 3);
        assert_eq!(
            history.list_revisions(&created.id, 500).await.unwrap().len(),
            MAX_REVISIONS
        );
    }

    #[tokio::test]
    async fn test_unknown_snippet_has_no_history() {
        let store = Arc::new(MemoryStore::new());
        let history = HistoryReader::new(store, Layout::default());
        assert!(history
            .list_revisions(&SnippetId::from_string("ghost"), 50)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_remote_failure_fetching_stats_is_returned() {
        let (history, id) = history_with_failing_details(|_| StoreError::Remote {
            status: Some(403),
            message: "rate limited".to_string(),
        })
        .await;

        let err = history.list_revisions(&id, 50).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Store(StoreError::Remote {
                status: Some(403),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_missing_commit_detail_leaves_stats_unknown() {
        let (history, id) = history_with_failing_details(|sha| StoreError::not_found(sha)).await;

        let revisions = history.list_revisions(&id, 50).await.unwrap();
        assert_eq!(revisions.len(), 2);
        assert!(revisions.iter().all(|r| r.stats.is_none()));
    }
}
