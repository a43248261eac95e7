//! In-memory content store for testing.
//!
//! Keeps a single linear branch of commits. Every commit records the full
//! tree (path -> blob id) plus the per-file changes it introduced, so history,
//! trees, blobs and diffs behave like the real remote.

use crate::{
    CommitDetail, CommitSummary, ContentStore, DirEntry, EntryKind, FileChange, FileContent,
    FileStatus, PathContent, Signature, StoreError, StoreResult, TreeEntry, TreeEntryKind,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use similar::{ChangeTag, TextDiff};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::RwLock;

/// An operation recorded by [`MemoryStore`], in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Read(String),
    Write(String),
    Delete(String),
    History(String),
    CommitDetail(String),
    Tree(String),
    Blob(String),
}

#[derive(Debug, Clone)]
struct Commit {
    sha: String,
    parent: Option<String>,
    message: String,
    date: DateTime<Utc>,
    tree: BTreeMap<String, String>,
    changes: Vec<FileChange>,
}

#[derive(Default)]
struct State {
    head: BTreeMap<String, String>,
    blobs: HashMap<String, Vec<u8>>,
    commits: Vec<Commit>,
    index: HashMap<String, usize>,
    calls: Vec<StoreCall>,
    /// Mutations still allowed before injected failures start.
    remaining_mutations: Option<usize>,
}

impl State {
    fn tip(&self) -> Option<&Commit> {
        self.commits.last()
    }

    /// Resolve a ref: a known commit sha, otherwise the branch head.
    fn tree_at(&self, reference: &str) -> &BTreeMap<String, String> {
        match self.index.get(reference) {
            Some(&i) => &self.commits[i].tree,
            None => &self.head,
        }
    }

    fn take_mutation_slot(&mut self, path: &str) -> StoreResult<()> {
        match self.remaining_mutations {
            Some(0) => Err(StoreError::Remote {
                status: Some(500),
                message: format!("injected failure writing {path}"),
            }),
            Some(ref mut n) => {
                *n -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn commit(&mut self, message: &str, changes: Vec<FileChange>) {
        let parent = self.tip().map(|c| c.sha.clone());
        let mut hasher = Sha256::new();
        hasher.update(parent.as_deref().unwrap_or_default());
        hasher.update(message);
        hasher.update(self.commits.len().to_le_bytes());
        for (path, id) in &self.head {
            hasher.update(path);
            hasher.update(id);
        }
        let sha = format!("{:x}", hasher.finalize());

        let commit = Commit {
            sha: sha.clone(),
            parent,
            message: message.to_string(),
            date: Utc::now(),
            tree: self.head.clone(),
            changes,
        };
        self.index.insert(sha, self.commits.len());
        self.commits.push(commit);
    }
}

/// In-memory content store.
///
/// This stores all data in memory and is not persistent.
pub struct MemoryStore {
    state: RwLock<State>,
    author: Signature,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
            author: Signature {
                name: "snipvault".to_string(),
                email: "snipvault@localhost".to_string(),
                date: DateTime::<Utc>::UNIX_EPOCH,
            },
        }
    }

    /// Set the name and email recorded on commits.
    pub fn with_author(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.author.name = name.into();
        self.author.email = email.into();
        self
    }

    /// Let `n` more writes/deletes succeed, then fail every mutation with a
    /// remote error. Reads are unaffected.
    pub fn fail_after(&self, n: usize) {
        if let Ok(mut state) = self.state.write() {
            state.remaining_mutations = Some(n);
        }
    }

    /// Stop injecting failures.
    pub fn heal(&self) {
        if let Ok(mut state) = self.state.write() {
            state.remaining_mutations = None;
        }
    }

    /// All recorded operations, oldest first.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.state
            .read()
            .map(|s| s.calls.clone())
            .unwrap_or_default()
    }

    /// Forget recorded operations.
    pub fn clear_calls(&self) {
        if let Ok(mut state) = self.state.write() {
            state.calls.clear();
        }
    }

    /// Number of commits on the branch.
    pub fn commit_count(&self) -> usize {
        self.state.read().map(|s| s.commits.len()).unwrap_or(0)
    }

    /// Sha of the most recent commit.
    pub fn head_sha(&self) -> Option<String> {
        self.state
            .read()
            .ok()
            .and_then(|s| s.tip().map(|c| c.sha.clone()))
    }

    /// Every file path at the branch head.
    pub fn paths(&self) -> Vec<String> {
        self.state
            .read()
            .map(|s| s.head.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn write_state(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn blob_id(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("blob {}\0", content.len()));
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

fn normalize(path: &str) -> &str {
    path.trim_matches('/')
}

fn last_segment(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

/// Line stats and unified hunks between two versions of a file.
fn change_record(
    filename: &str,
    status: FileStatus,
    old: &[u8],
    new: &[u8],
) -> FileChange {
    let old = String::from_utf8_lossy(old);
    let new = String::from_utf8_lossy(new);
    let diff = TextDiff::from_lines(old.as_ref(), new.as_ref());

    let mut additions = 0;
    let mut deletions = 0;
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Insert => additions += 1,
            ChangeTag::Delete => deletions += 1,
            ChangeTag::Equal => {}
        }
    }

    let mut patch = String::new();
    for hunk in diff.unified_diff().context_radius(3).iter_hunks() {
        patch.push_str(&hunk.to_string());
    }
    let patch = patch.trim_end_matches('\n');

    FileChange {
        filename: filename.to_string(),
        status,
        additions,
        deletions,
        patch: (!patch.is_empty()).then(|| patch.to_string()),
        previous_filename: None,
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn read_path(&self, path: &str, reference: &str) -> StoreResult<PathContent> {
        let path = normalize(path);
        let mut state = self.write_state()?;
        state.calls.push(StoreCall::Read(path.to_string()));

        let tree = state.tree_at(reference);
        if let Some(id) = tree.get(path) {
            return Ok(PathContent::File(FileContent {
                path: path.to_string(),
                name: last_segment(path),
                content: state.blobs.get(id).cloned().unwrap_or_default(),
                hash: id.clone(),
            }));
        }

        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{path}/")
        };
        let mut entries = Vec::new();
        let mut dirs = BTreeSet::new();
        for (full, id) in tree.range(prefix.clone()..) {
            let Some(rest) = full.strip_prefix(&prefix) else {
                break;
            };
            match rest.split_once('/') {
                None => entries.push(DirEntry {
                    name: rest.to_string(),
                    path: full.clone(),
                    kind: EntryKind::File,
                    hash: id.clone(),
                }),
                Some((dir, _)) => {
                    dirs.insert(dir.to_string());
                }
            }
        }

        if entries.is_empty() && dirs.is_empty() {
            return Err(StoreError::not_found(path));
        }

        for dir in dirs {
            let dir_path = format!("{prefix}{dir}");
            entries.push(DirEntry {
                hash: blob_id(dir_path.as_bytes()),
                name: dir,
                path: dir_path,
                kind: EntryKind::Dir,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(PathContent::Directory(entries))
    }

    async fn write_file(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        _branch: &str,
        expected_hash: Option<&str>,
    ) -> StoreResult<String> {
        let path = normalize(path);
        let mut state = self.write_state()?;
        state.calls.push(StoreCall::Write(path.to_string()));
        state.take_mutation_slot(path)?;

        let current = state.head.get(path).cloned();
        match (current.as_deref(), expected_hash) {
            (Some(current), Some(expected)) if current != expected => {
                return Err(StoreError::conflict(format!(
                    "{path} is at {current}, expected {expected}"
                )));
            }
            (Some(_), None) => {
                return Err(StoreError::conflict(format!(
                    "{path} already exists and no sha was supplied"
                )));
            }
            (None, Some(expected)) => {
                return Err(StoreError::conflict(format!(
                    "{path} does not exist, expected {expected}"
                )));
            }
            _ => {}
        }

        let id = blob_id(content);
        let old = current
            .as_ref()
            .and_then(|old| state.blobs.get(old))
            .cloned()
            .unwrap_or_default();
        let status = if current.is_some() {
            FileStatus::Modified
        } else {
            FileStatus::Added
        };
        let change = change_record(path, status, &old, content);

        state.blobs.insert(id.clone(), content.to_vec());
        state.head.insert(path.to_string(), id.clone());
        let changes = if current.as_deref() == Some(id.as_str()) {
            Vec::new()
        } else {
            vec![change]
        };
        state.commit(message, changes);

        Ok(id)
    }

    async fn delete_file(
        &self,
        path: &str,
        message: &str,
        hash: &str,
        _branch: &str,
    ) -> StoreResult<()> {
        let path = normalize(path);
        let mut state = self.write_state()?;
        state.calls.push(StoreCall::Delete(path.to_string()));
        state.take_mutation_slot(path)?;

        let current = state
            .head
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::not_found(path))?;
        if current != hash {
            return Err(StoreError::conflict(format!(
                "{path} is at {current}, expected {hash}"
            )));
        }

        let old = state.blobs.get(&current).cloned().unwrap_or_default();
        let change = change_record(path, FileStatus::Removed, &old, b"");
        state.head.remove(path);
        state.commit(message, vec![change]);
        Ok(())
    }

    async fn list_history(
        &self,
        path: &str,
        reference: &str,
        limit: usize,
    ) -> StoreResult<Vec<CommitSummary>> {
        let path = normalize(path);
        let mut state = self.write_state()?;
        state.calls.push(StoreCall::History(path.to_string()));

        let prefix = format!("{path}/");
        let touches = |c: &Commit| {
            path.is_empty()
                || c.changes
                    .iter()
                    .any(|f| f.filename == path || f.filename.starts_with(&prefix))
        };

        let mut cursor = match state.index.get(reference) {
            Some(&i) => Some(i),
            None => state.commits.len().checked_sub(1),
        };
        let mut out = Vec::new();
        while let Some(i) = cursor {
            if out.len() >= limit {
                break;
            }
            let commit = &state.commits[i];
            if touches(commit) {
                let signature = Signature {
                    date: commit.date,
                    ..self.author.clone()
                };
                out.push(CommitSummary {
                    sha: commit.sha.clone(),
                    message: commit.message.clone(),
                    author: signature.clone(),
                    committer: signature,
                });
            }
            cursor = commit
                .parent
                .as_ref()
                .and_then(|p| state.index.get(p).copied());
        }
        Ok(out)
    }

    async fn commit_detail(&self, sha: &str) -> StoreResult<CommitDetail> {
        let mut state = self.write_state()?;
        state.calls.push(StoreCall::CommitDetail(sha.to_string()));

        let i = *state
            .index
            .get(sha)
            .ok_or_else(|| StoreError::not_found(sha))?;
        let commit = &state.commits[i];
        Ok(CommitDetail {
            sha: commit.sha.clone(),
            parents: commit.parent.iter().cloned().collect(),
            files: commit.changes.clone(),
        })
    }

    async fn tree_recursive(&self, sha: &str) -> StoreResult<Vec<TreeEntry>> {
        let mut state = self.write_state()?;
        state.calls.push(StoreCall::Tree(sha.to_string()));

        let i = *state
            .index
            .get(sha)
            .ok_or_else(|| StoreError::not_found(sha))?;
        let tree = &state.commits[i].tree;

        let mut dirs = BTreeSet::new();
        let mut entries = Vec::new();
        for (path, id) in tree {
            let mut parent = path.as_str();
            while let Some((dir, _)) = parent.rsplit_once('/') {
                dirs.insert(dir.to_string());
                parent = dir;
            }
            entries.push(TreeEntry {
                path: path.clone(),
                id: id.clone(),
                kind: TreeEntryKind::Blob,
            });
        }
        entries.extend(dirs.into_iter().map(|dir| TreeEntry {
            id: blob_id(dir.as_bytes()),
            path: dir,
            kind: TreeEntryKind::Tree,
        }));
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    async fn blob(&self, id: &str) -> StoreResult<Vec<u8>> {
        let mut state = self.write_state()?;
        state.calls.push(StoreCall::Blob(id.to_string()));
        state
            .blobs
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(id))
    }
}
