//! GitHub REST API content store.
//!
//! Uses the contents API for reads and writes, the commits API for history
//! and stats, and the git data API for trees and blobs.

use crate::{
    CommitDetail, CommitSummary, ContentStore, Credential, DirEntry, EntryKind, FileChange,
    FileContent, FileStatus, PathContent, Signature, StoreConnector, StoreError, StoreResult,
    TreeEntry, TreeEntryKind,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, warn};
use url::Url;

/// Default GitHub API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Which repository to talk to, and where the API lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubSettings {
    pub api_url: String,
    pub owner: String,
    pub repo: String,
}

impl GitHubSettings {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }
}

/// GitHub-backed content store bound to one (optional) credential.
#[derive(Clone)]
pub struct GitHubStore {
    client: Client,
    settings: GitHubSettings,
    token: Option<String>,
}

impl GitHubStore {
    /// Create a store with its own HTTP client.
    pub fn new(settings: GitHubSettings, credential: Option<&Credential>) -> StoreResult<Self> {
        Ok(Self::with_client(build_client()?, settings, credential))
    }

    /// Create a store sharing an existing HTTP client.
    pub fn with_client(
        client: Client,
        settings: GitHubSettings,
        credential: Option<&Credential>,
    ) -> Self {
        Self {
            client,
            settings,
            token: credential.map(|c| c.token().to_string()),
        }
    }

    /// Build a URL under the API root from raw path segments.
    fn url(&self, segments: &[&str]) -> StoreResult<Url> {
        let mut url = Url::parse(&self.settings.api_url)
            .map_err(|e| StoreError::remote(format!("invalid API url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::remote("API url cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn repo_url(&self, rest: &[&str]) -> StoreResult<Url> {
        let mut segments = vec!["repos", self.settings.owner.as_str(), self.settings.repo.as_str()];
        segments.extend_from_slice(rest);
        self.url(&segments)
    }

    fn contents_url(&self, path: &str) -> StoreResult<Url> {
        let mut segments = vec!["contents"];
        segments.extend(path.split('/').filter(|s| !s.is_empty()));
        self.repo_url(&segments)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        match &self.token {
            Some(token) => builder.header("Authorization", format!("Bearer {}", token)),
            None => builder,
        }
    }
}

fn build_client() -> StoreResult<Client> {
    Ok(Client::builder()
        .user_agent(concat!("snipvault/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Turn a non-success response into the matching [`StoreError`].
async fn check(response: Response, what: &str) -> StoreResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    match status {
        StatusCode::NOT_FOUND => Err(StoreError::not_found(what)),
        StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => {
            Err(StoreError::conflict(format!("{what}: {body}")))
        }
        // GitHub answers 422 when a sha is missing or malformed for an existing file.
        StatusCode::UNPROCESSABLE_ENTITY if body.contains("sha") => {
            Err(StoreError::conflict(format!("{what}: {body}")))
        }
        _ => {
            error!("GitHub request for {} failed: {} - {}", what, status, body);
            Err(StoreError::Remote {
                status: Some(status.as_u16()),
                message: body,
            })
        }
    }
}

fn decode_base64(content: &str) -> StoreResult<Vec<u8>> {
    let cleaned: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(cleaned)
        .map_err(|e| StoreError::decode(format!("invalid base64 content: {e}")))
}

#[async_trait]
impl ContentStore for GitHubStore {
    async fn read_path(&self, path: &str, reference: &str) -> StoreResult<PathContent> {
        let mut url = self.contents_url(path)?;
        url.query_pairs_mut().append_pair("ref", reference);
        debug!(path, reference, "Reading contents");

        let response = check(self.request(Method::GET, url).send().await?, path).await?;
        match response.json::<ContentsResponse>().await? {
            ContentsResponse::Directory(items) => Ok(PathContent::Directory(
                items
                    .into_iter()
                    .filter_map(|item| {
                        let kind = match item.kind.as_str() {
                            "file" => EntryKind::File,
                            "dir" => EntryKind::Dir,
                            // Symlinks and submodules never hold snippet data.
                            _ => return None,
                        };
                        Some(DirEntry {
                            name: item.name,
                            path: item.path,
                            kind,
                            hash: item.sha,
                        })
                    })
                    .collect(),
            )),
            ContentsResponse::File(item) => {
                if item.kind != "file" {
                    return Err(StoreError::decode(format!(
                        "{} is a {}, not a file",
                        item.path, item.kind
                    )));
                }
                let content = match (item.content.as_deref(), item.encoding.as_deref()) {
                    (Some(body), Some("base64")) => decode_base64(body)?,
                    (Some(body), _) => body.as_bytes().to_vec(),
                    (None, _) => Vec::new(),
                };
                Ok(PathContent::File(FileContent {
                    path: item.path,
                    name: item.name,
                    content,
                    hash: item.sha,
                }))
            }
        }
    }

    async fn write_file(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        branch: &str,
        expected_hash: Option<&str>,
    ) -> StoreResult<String> {
        let url = self.contents_url(path)?;
        debug!(path, branch, has_sha = expected_hash.is_some(), "Writing file");

        let body = PutContents {
            message,
            content: STANDARD.encode(content),
            branch,
            sha: expected_hash,
        };
        let response = check(
            self.request(Method::PUT, url).json(&body).send().await?,
            path,
        )
        .await?;
        let written: PutContentsResponse = response.json().await?;
        Ok(written.content.sha)
    }

    async fn delete_file(
        &self,
        path: &str,
        message: &str,
        hash: &str,
        branch: &str,
    ) -> StoreResult<()> {
        let url = self.contents_url(path)?;
        debug!(path, branch, "Deleting file");

        let body = DeleteContents {
            message,
            sha: hash,
            branch,
        };
        check(
            self.request(Method::DELETE, url).json(&body).send().await?,
            path,
        )
        .await?;
        Ok(())
    }

    async fn list_history(
        &self,
        path: &str,
        reference: &str,
        limit: usize,
    ) -> StoreResult<Vec<CommitSummary>> {
        let mut url = self.repo_url(&["commits"])?;
        url.query_pairs_mut()
            .append_pair("path", path)
            .append_pair("sha", reference)
            .append_pair("per_page", &limit.clamp(1, 100).to_string());
        debug!(path, reference, limit, "Listing history");

        let response = check(self.request(Method::GET, url).send().await?, path).await?;
        let commits: Vec<CommitItem> = response.json().await?;
        Ok(commits
            .into_iter()
            .take(limit)
            .map(CommitItem::into_summary)
            .collect())
    }

    async fn commit_detail(&self, sha: &str) -> StoreResult<CommitDetail> {
        let url = self.repo_url(&["commits", sha])?;
        debug!(sha, "Fetching commit detail");

        let response = check(self.request(Method::GET, url).send().await?, sha).await?;
        let commit: CommitItem = response.json().await?;
        Ok(CommitDetail {
            sha: commit.sha,
            parents: commit.parents.into_iter().map(|p| p.sha).collect(),
            files: commit
                .files
                .into_iter()
                .map(|f| FileChange {
                    status: FileStatus::parse(&f.status),
                    filename: f.filename,
                    additions: f.additions,
                    deletions: f.deletions,
                    patch: f.patch,
                    previous_filename: f.previous_filename,
                })
                .collect(),
        })
    }

    async fn tree_recursive(&self, sha: &str) -> StoreResult<Vec<TreeEntry>> {
        let mut url = self.repo_url(&["git", "trees", sha])?;
        url.query_pairs_mut().append_pair("recursive", "1");
        debug!(sha, "Fetching recursive tree");

        let response = check(self.request(Method::GET, url).send().await?, sha).await?;
        let tree: TreeResponse = response.json().await?;
        if tree.truncated {
            warn!(sha, "Tree listing was truncated by the remote");
        }
        Ok(tree
            .tree
            .into_iter()
            .map(|item| TreeEntry {
                kind: TreeEntryKind::parse(&item.kind),
                path: item.path,
                id: item.sha,
            })
            .collect())
    }

    async fn blob(&self, id: &str) -> StoreResult<Vec<u8>> {
        let url = self.repo_url(&["git", "blobs", id])?;
        debug!(id, "Fetching blob");

        let response = check(self.request(Method::GET, url).send().await?, id).await?;
        let blob: BlobResponse = response.json().await?;
        match blob.encoding.as_str() {
            "base64" => decode_base64(&blob.content),
            _ => Ok(blob.content.into_bytes()),
        }
    }
}

/// Hands out [`GitHubStore`]s bound to per-request credentials.
#[derive(Clone)]
pub struct GitHubConnector {
    client: Client,
    settings: GitHubSettings,
    fallback: Option<Credential>,
}

impl GitHubConnector {
    pub fn new(settings: GitHubSettings) -> StoreResult<Self> {
        Ok(Self {
            client: build_client()?,
            settings,
            fallback: None,
        })
    }

    /// Credential used when a request carries none (e.g. a server token for
    /// reading a private repository).
    pub fn with_fallback(mut self, credential: Option<Credential>) -> Self {
        self.fallback = credential;
        self
    }
}

impl StoreConnector for GitHubConnector {
    fn connect(&self, credential: Option<&Credential>) -> Arc<dyn ContentStore> {
        Arc::new(GitHubStore::with_client(
            self.client.clone(),
            self.settings.clone(),
            credential.or(self.fallback.as_ref()),
        ))
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContentsResponse {
    Directory(Vec<ContentItem>),
    File(ContentItem),
}

#[derive(Debug, Deserialize)]
struct ContentItem {
    name: String,
    path: String,
    sha: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Serialize)]
struct PutContents<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PutContentsResponse {
    content: ShaRef,
}

#[derive(Debug, Serialize)]
struct DeleteContents<'a> {
    message: &'a str,
    sha: &'a str,
    branch: &'a str,
}

#[derive(Debug, Deserialize)]
struct ShaRef {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct CommitItem {
    sha: String,
    commit: CommitData,
    #[serde(default)]
    parents: Vec<ShaRef>,
    #[serde(default)]
    files: Vec<CommitFile>,
}

impl CommitItem {
    fn into_summary(self) -> CommitSummary {
        let author = self.commit.author.map(GitSignature::into_signature);
        let committer = self.commit.committer.map(GitSignature::into_signature);
        let fallback = || Signature {
            name: String::new(),
            email: String::new(),
            date: DateTime::<Utc>::UNIX_EPOCH,
        };
        CommitSummary {
            sha: self.sha,
            message: self.commit.message,
            author: author.clone().or_else(|| committer.clone()).unwrap_or_else(fallback),
            committer: committer.or(author).unwrap_or_else(fallback),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CommitData {
    message: String,
    #[serde(default)]
    author: Option<GitSignature>,
    #[serde(default)]
    committer: Option<GitSignature>,
}

#[derive(Debug, Deserialize)]
struct GitSignature {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    date: DateTime<Utc>,
}

impl GitSignature {
    fn into_signature(self) -> Signature {
        Signature {
            name: self.name,
            email: self.email,
            date: self.date,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CommitFile {
    filename: String,
    status: String,
    #[serde(default)]
    additions: u64,
    #[serde(default)]
    deletions: u64,
    #[serde(default)]
    patch: Option<String>,
    #[serde(default)]
    previous_filename: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    tree: Vec<TreeItem>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct TreeItem {
    path: String,
    sha: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct BlobResponse {
    content: String,
    encoding: String,
}
