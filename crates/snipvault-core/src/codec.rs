//! `index.md` front-matter codec and language inference.
//!
//! A snippet directory holds one `index.md` whose YAML front-matter carries
//! the metadata and the ordered `{filename, language}` list. The body is
//! always empty; file contents live in sibling files.

use crate::error::{CodecError, CodecResult};
use crate::model::{now, Snippet, SnippetFile, SnippetId, SnippetInput};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A `{filename, language}` pair declared in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexFile {
    pub filename: String,
    pub language: String,
}

/// Everything stored in an `index.md`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMetadata {
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tags: Vec<String>,
    pub is_public: bool,
    pub files: Vec<IndexFile>,
    /// `createdAt` text that could not be parsed. Written back verbatim so a
    /// rewrite never replaces it with the read-time default.
    pub created_at_raw: Option<String>,
}

impl IndexMetadata {
    /// Metadata for submitted input, with the given timestamps.
    pub fn from_input(
        input: &SnippetInput,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            title: input.title.clone(),
            description: input.description.clone(),
            created_at,
            updated_at,
            tags: input.tags.clone(),
            is_public: input.is_public,
            files: input
                .files
                .iter()
                .map(|f| IndexFile {
                    filename: f.filename.clone(),
                    language: f.resolved_language(),
                })
                .collect(),
            created_at_raw: None,
        }
    }

    /// Carry the creation time of `existing` over, including unparsed text.
    pub fn with_created_from(mut self, existing: &IndexMetadata) -> Self {
        self.created_at = existing.created_at;
        self.created_at_raw = existing.created_at_raw.clone();
        self
    }

    /// Metadata of an existing snippet.
    pub fn from_snippet(snippet: &Snippet) -> Self {
        Self {
            title: snippet.title.clone(),
            description: snippet.description.clone(),
            created_at: snippet.created_at,
            updated_at: snippet.updated_at,
            tags: snippet.tags.clone(),
            is_public: snippet.is_public,
            files: snippet
                .files
                .iter()
                .map(|f| IndexFile {
                    filename: f.filename.clone(),
                    language: f.language.clone(),
                })
                .collect(),
            created_at_raw: None,
        }
    }

    /// Combine with resolved file contents into a snippet.
    pub fn into_snippet(
        self,
        id: SnippetId,
        files: Vec<SnippetFile>,
        version: Option<String>,
    ) -> Snippet {
        Snippet {
            id,
            title: self.title,
            description: self.description,
            tags: self.tags,
            is_public: self.is_public,
            created_at: self.created_at,
            updated_at: self.updated_at,
            files,
            version,
        }
    }

    /// Declared language of a file, if the index lists it.
    pub fn language_of(&self, filename: &str) -> Option<&str> {
        self.files
            .iter()
            .find(|f| f.filename == filename)
            .map(|f| f.language.as_str())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FrontmatterOut<'a> {
    title: &'a str,
    description: &'a str,
    created_at: String,
    updated_at: String,
    tags: &'a [String],
    is_public: bool,
    files: &'a [IndexFile],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FrontmatterIn {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    is_public: Option<bool>,
    #[serde(default)]
    files: Option<Vec<FrontmatterFile>>,
}

#[derive(Deserialize)]
struct FrontmatterFile {
    filename: String,
    #[serde(default)]
    language: Option<String>,
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse RFC 3339, or a naive date-time or date taken as UTC.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Some(ts.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ts| ts.and_utc())
}

/// Read a timestamp field, defaulting to now. Returns the raw text too when
/// it is present but unparseable.
fn read_timestamp(field: &str, value: Option<String>) -> (DateTime<Utc>, Option<String>) {
    let Some(value) = value else {
        return (now(), None);
    };
    match parse_timestamp(&value) {
        Some(ts) => (ts, None),
        None => {
            warn!(field, value = %value, "Unparseable timestamp in index, using now");
            (now(), Some(value))
        }
    }
}

/// Render an index as front-matter followed by an empty body.
pub fn encode_index(meta: &IndexMetadata) -> CodecResult<String> {
    let yaml = serde_yaml::to_string(&FrontmatterOut {
        title: &meta.title,
        description: &meta.description,
        created_at: meta
            .created_at_raw
            .clone()
            .unwrap_or_else(|| format_timestamp(&meta.created_at)),
        updated_at: format_timestamp(&meta.updated_at),
        tags: &meta.tags,
        is_public: meta.is_public,
        files: &meta.files,
    })?;
    Ok(format!("---\n{yaml}---\n"))
}

/// Parse an `index.md`, filling documented defaults for missing fields.
pub fn decode_index(text: &str) -> CodecResult<IndexMetadata> {
    let content = text.trim_start_matches('\u{feff}').trim();
    if !content.starts_with("---") {
        return Err(CodecError::MissingFrontmatter);
    }

    let rest = &content[3..];
    let end_idx = rest.find("\n---").ok_or(CodecError::Unterminated)?;
    let frontmatter_str = rest[..end_idx].trim();

    if frontmatter_str.is_empty() {
        return Err(CodecError::MissingTitle);
    }
    let raw: FrontmatterIn = serde_yaml::from_str(frontmatter_str)?;

    let title = raw
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or(CodecError::MissingTitle)?;

    let (created_at, created_at_raw) = read_timestamp("createdAt", raw.created_at);
    let (updated_at, _) = read_timestamp("updatedAt", raw.updated_at);

    Ok(IndexMetadata {
        title,
        description: raw.description.unwrap_or_default(),
        created_at,
        updated_at,
        tags: raw.tags.unwrap_or_default(),
        is_public: raw.is_public != Some(false),
        files: raw
            .files
            .unwrap_or_default()
            .into_iter()
            .map(|f| {
                let language = match f.language {
                    Some(lang) if !lang.trim().is_empty() => lang,
                    _ => infer_language(&f.filename).to_string(),
                };
                IndexFile {
                    filename: f.filename,
                    language,
                }
            })
            .collect(),
        created_at_raw,
    })
}

/// Language tag for a filename, from its lowercased extension.
///
/// Total: unknown or missing extensions map to `"text"`.
pub fn infer_language(filename: &str) -> &'static str {
    let Some((_, ext)) = filename.rsplit_once('.') else {
        return "text";
    };
    match ext.to_ascii_lowercase().as_str() {
        "js" | "jsx" => "javascript",
        "ts" | "tsx" => "typescript",
        "py" => "python",
        "rb" => "ruby",
        "go" => "go",
        "rs" => "rust",
        "java" => "java",
        "cpp" => "cpp",
        "c" => "c",
        "cs" => "csharp",
        "php" => "php",
        "swift" => "swift",
        "kt" => "kotlin",
        "scala" => "scala",
        "html" | "htm" => "html",
        "css" => "css",
        "scss" => "scss",
        "sass" => "sass",
        "less" => "less",
        "styl" | "stylus" => "stylus",
        "pug" | "jade" => "pug",
        "sql" => "sql",
        "sh" | "bash" | "zsh" => "bash",
        "ps1" => "powershell",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "xml" => "xml",
        "md" => "markdown",
        "txt" => "text",
        "vue" => "vue",
        _ => "text",
    }
}
