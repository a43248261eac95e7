//! Data returned by a content store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single file resolved at a ref.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    /// Full path inside the repository.
    pub path: String,
    /// Last path segment.
    pub name: String,
    /// Raw (already decoded) bytes.
    pub content: Vec<u8>,
    /// Content-hash token used for optimistic concurrency.
    pub hash: String,
}

impl FileContent {
    /// Content decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub path: String,
    pub kind: EntryKind,
    /// Content-hash token (for files) or tree id (for directories).
    pub hash: String,
}

impl DirEntry {
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

/// What a path resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathContent {
    File(FileContent),
    Directory(Vec<DirEntry>),
}

/// Name, email and time of a commit author or committer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub email: String,
    pub date: DateTime<Utc>,
}

/// A commit as listed by the history query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSummary {
    pub sha: String,
    pub message: String,
    pub author: Signature,
    pub committer: Signature,
}

/// How a file changed in a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    Removed,
    Modified,
    Renamed,
}

impl FileStatus {
    /// Map a remote status string onto the four statuses we track.
    ///
    /// `copied` counts as an addition; `changed` and `unchanged` as a modification.
    pub fn parse(s: &str) -> Self {
        match s {
            "added" | "copied" => FileStatus::Added,
            "removed" => FileStatus::Removed,
            "renamed" => FileStatus::Renamed,
            _ => FileStatus::Modified,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Added => "added",
            FileStatus::Removed => "removed",
            FileStatus::Modified => "modified",
            FileStatus::Renamed => "renamed",
        }
    }
}

/// Per-file change record of a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChange {
    pub filename: String,
    pub status: FileStatus,
    pub additions: u64,
    pub deletions: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_filename: Option<String>,
}

/// Parents and per-file changes of one commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitDetail {
    pub sha: String,
    pub parents: Vec<String>,
    pub files: Vec<FileChange>,
}

impl CommitDetail {
    /// Sum of additions across all touched files.
    pub fn additions(&self) -> u64 {
        self.files.iter().map(|f| f.additions).sum()
    }

    /// Sum of deletions across all touched files.
    pub fn deletions(&self) -> u64 {
        self.files.iter().map(|f| f.deletions).sum()
    }
}

/// Kind of a tree object entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeEntryKind {
    Blob,
    Tree,
    Commit,
}

impl TreeEntryKind {
    pub fn parse(s: &str) -> Self {
        match s {
            "tree" => TreeEntryKind::Tree,
            "commit" => TreeEntryKind::Commit,
            _ => TreeEntryKind::Blob,
        }
    }
}

/// One entry of a recursive tree listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: String,
    pub id: String,
    pub kind: TreeEntryKind,
}
