//! Snippet, revision and diff data structures.

use crate::codec::infer_language;
use crate::error::{CoreError, CoreResult};
use crate::INDEX_FILE;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use snipvault_store::{FileChange, Signature};
use std::collections::HashSet;
use uuid::Uuid;

/// Unique identifier for a snippet, also its directory name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnippetId(pub String);

impl SnippetId {
    /// Create a new random snippet ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a snippet ID from a string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the ID as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this id can name a directory directly under the snippets root.
    pub fn is_path_safe(&self) -> bool {
        !self.0.is_empty()
            && self.0 != "."
            && self.0 != ".."
            && !self.0.contains(&['/', '\\'][..])
    }
}

impl Default for SnippetId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SnippetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Current time at the precision stored in `index.md`.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// One named file of a snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnippetFile {
    pub filename: String,
    pub language: String,
    pub code: String,
}

/// A snippet as stored in the remote repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    pub id: SnippetId,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub files: Vec<SnippetFile>,

    /// Content-hash token of `index.md` at the time of the read. Pass it back
    /// to `update` to detect concurrent edits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// A file as submitted for create or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInput {
    pub filename: String,
    /// Explicit language tag; inferred from the extension when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default)]
    pub code: String,
}

impl FileInput {
    pub fn new(filename: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            language: None,
            code: code.into(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// The explicit language, or the one inferred from the filename.
    pub fn resolved_language(&self) -> String {
        match self.language.as_deref().map(str::trim) {
            Some(lang) if !lang.is_empty() => lang.to_string(),
            _ => infer_language(&self.filename).to_string(),
        }
    }

    pub fn to_file(&self) -> SnippetFile {
        SnippetFile {
            filename: self.filename.clone(),
            language: self.resolved_language(),
            code: self.code.clone(),
        }
    }
}

fn default_public() -> bool {
    true
}

/// Snippet metadata and files as submitted for create or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnippetInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_public")]
    pub is_public: bool,
    pub files: Vec<FileInput>,
}

impl SnippetInput {
    /// Reject input that cannot be persisted as a snippet directory.
    pub fn validate(&self) -> CoreResult<()> {
        if self.title.trim().is_empty() {
            return Err(CoreError::validation("title must not be empty"));
        }
        if self.files.is_empty() {
            return Err(CoreError::validation("a snippet needs at least one file"));
        }

        let mut seen = HashSet::new();
        for file in &self.files {
            let name = file.filename.as_str();
            if name.trim().is_empty() {
                return Err(CoreError::validation("filename must not be empty"));
            }
            if name.contains(&['/', '\\'][..]) || name == "." || name == ".." {
                return Err(CoreError::validation(format!(
                    "filename {name:?} is not a plain file name"
                )));
            }
            if name == INDEX_FILE {
                return Err(CoreError::validation(format!(
                    "filename {INDEX_FILE:?} is reserved"
                )));
            }
            if !seen.insert(name) {
                return Err(CoreError::validation(format!(
                    "duplicate filename {name:?}"
                )));
            }
        }
        Ok(())
    }
}

/// Display category of a revision, derived from its commit message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevisionKind {
    Create,
    Update,
    Add,
    Delete,
    Other,
}

impl RevisionKind {
    /// Classify a commit message by the prefixes the repository writes.
    pub fn classify(message: &str) -> Self {
        if message.contains("Create snippet") {
            RevisionKind::Create
        } else if message.contains("Update snippet") {
            RevisionKind::Update
        } else if message.contains("Add file") {
            RevisionKind::Add
        } else if message.contains("Update file") {
            RevisionKind::Update
        } else if message.contains("Delete file") || message.contains("Delete snippet") {
            RevisionKind::Delete
        } else {
            RevisionKind::Other
        }
    }
}

/// Aggregate line counts of a commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionStats {
    pub additions: u64,
    pub deletions: u64,
    pub total: u64,
}

impl RevisionStats {
    pub fn new(additions: u64, deletions: u64) -> Self {
        Self {
            additions,
            deletions,
            total: additions + deletions,
        }
    }
}

/// One commit touching a snippet directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub sha: String,
    pub message: String,
    pub author: Signature,
    pub committer: Signature,
    /// Line counts, or `None` when the commit detail was not found.
    #[serde(default)]
    pub stats: Option<RevisionStats>,
    pub kind: RevisionKind,
}

/// Per-file changes of a commit relative to its first parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diff {
    pub sha: String,
    /// First parent, or empty for a root commit.
    pub parent_sha: String,
    pub files: Vec<FileChange>,
}

impl Diff {
    pub fn is_root(&self) -> bool {
        self.parent_sha.is_empty()
    }

    /// Keep only files under `dir` (or renamed out of it).
    pub fn scoped_to(mut self, dir: &str) -> Self {
        let prefix = format!("{}/", dir.trim_matches('/'));
        self.files.retain(|f| {
            f.filename.starts_with(&prefix)
                || f
                    .previous_filename
                    .as_deref()
                    .is_some_and(|p| p.starts_with(&prefix))
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snipvault_store::FileStatus;

    fn input(files: &[&str]) -> SnippetInput {
        SnippetInput {
            title: "Hello".to_string(),
            description: String::new(),
            tags: vec![],
            is_public: true,
            files: files.iter().map(|f| FileInput::new(*f, "")).collect(),
        }
    }

    #[test]
    fn test_snippet_id_is_unique_and_path_safe() {
        let a = SnippetId::new();
        let b = SnippetId::new();
        assert_ne!(a, b);
        assert!(a.is_path_safe());
        assert!(!SnippetId::from_string("../etc").is_path_safe());
        assert!(!SnippetId::from_string("").is_path_safe());
        assert!(!SnippetId::from_string("..").is_path_safe());
    }

    #[test]
    fn test_validate_accepts_plain_files() {
        assert!(input(&["main.rs", "Cargo.toml"]).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        let mut no_title = input(&["a.rs"]);
        no_title.title = "   ".to_string();
        assert!(matches!(no_title.validate(), Err(CoreError::Validation(_))));

        for files in [
            &[][..],
            &[""][..],
            &["a/b.rs"][..],
            &["a\\b.rs"][..],
            &[".."][..],
            &["index.md"][..],
            &["a.rs", "a.rs"][..],
        ] {
            assert!(
                matches!(input(files).validate(), Err(CoreError::Validation(_))),
                "{files:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_input_deserializes_with_defaults() {
        let input: SnippetInput = serde_json::from_str(
            r#"{"title": "T", "files": [{"filename": "a.py", "code": "print()"}]}"#,
        )
        .unwrap();
        assert!(input.is_public);
        assert!(input.tags.is_empty());
        assert_eq!(input.files[0].resolved_language(), "python");
    }

    #[test]
    fn test_explicit_language_wins() {
        let file = FileInput::new("build", "make").with_language("makefile");
        assert_eq!(file.to_file().language, "makefile");
        let blank = FileInput::new("a.rs", "").with_language(" ");
        assert_eq!(blank.resolved_language(), "rust");
    }

    #[test]
    fn test_classify_messages() {
        assert_eq!(
            RevisionKind::classify("Create snippet: Hello"),
            RevisionKind::Create
        );
        assert_eq!(
            RevisionKind::classify("Update snippet: Hello"),
            RevisionKind::Update
        );
        assert_eq!(RevisionKind::classify("Add file: a.rs"), RevisionKind::Add);
        assert_eq!(
            RevisionKind::classify("Update file: a.rs"),
            RevisionKind::Update
        );
        assert_eq!(
            RevisionKind::classify("Delete file: a.rs"),
            RevisionKind::Delete
        );
        assert_eq!(
            RevisionKind::classify("Delete snippet: abc"),
            RevisionKind::Delete
        );
        assert_eq!(RevisionKind::classify("Merge branch"), RevisionKind::Other);
    }

    #[test]
    fn test_stats_total() {
        assert_eq!(RevisionStats::new(3, 2).total, 5);
    }

    #[test]
    fn test_diff_scoped_to_directory() {
        let change = |name: &str, prev: Option<&str>| FileChange {
            filename: name.to_string(),
            status: FileStatus::Modified,
            additions: 1,
            deletions: 0,
            patch: None,
            previous_filename: prev.map(str::to_string),
        };
        let diff = Diff {
            sha: "c".to_string(),
            parent_sha: "p".to_string(),
            files: vec![
                change("snippets/a/main.rs", None),
                change("snippets/ab/main.rs", None),
                change("README.md", None),
                change("moved.rs", Some("snippets/a/old.rs")),
            ],
        };
        let scoped = diff.scoped_to("snippets/a/");
        let names: Vec<_> = scoped.files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, vec!["snippets/a/main.rs", "moved.rs"]);
    }

    #[test]
    fn test_snippet_serializes_camel_case() {
        let snippet = Snippet {
            id: SnippetId::from_string("abc"),
            title: "T".to_string(),
            description: String::new(),
            tags: vec![],
            is_public: false,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
            files: vec![],
            version: None,
        };
        let value = serde_json::to_value(&snippet).unwrap();
        assert_eq!(value["id"], "abc");
        assert_eq!(value["isPublic"], false);
        assert!(value.get("createdAt").is_some());
        assert!(value.get("version").is_none());
    }
}
