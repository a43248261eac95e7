//! HTTP routes for the server.

use crate::{identity::Identity, state::AppState};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use snipvault_core::{
    parse_patch, CoreError, PatchLine, Snippet, SnippetId, SnippetInput, Vault, MAX_REVISIONS,
};
use snipvault_store::{FileChange, StoreError};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/snippets", get(snippet_list))
        .route("/api/snippets/new", post(snippet_create))
        .route(
            "/api/snippets/{id}",
            get(snippet_get).put(snippet_update).delete(snippet_delete),
        )
        .route("/api/snippets/{id}/revisions", get(revision_list))
        .route("/api/snippets/{id}/revisions/{sha}", get(revision_snapshot))
        .route("/api/snippets/{id}/revisions/{sha}/diff", get(revision_diff))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// =============================================================================
// Error handling
// =============================================================================

#[derive(Debug, Serialize)]
struct ApiError {
    error: String,
    code: String,
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

impl ApiError {
    fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }

    fn not_found(msg: impl Into<String>) -> (StatusCode, Json<Self>) {
        (StatusCode::NOT_FOUND, Json(Self::new(msg, "NOT_FOUND")))
    }

    fn bad_request(msg: impl Into<String>) -> (StatusCode, Json<Self>) {
        (StatusCode::BAD_REQUEST, Json(Self::new(msg, "BAD_REQUEST")))
    }

    fn unauthorized() -> (StatusCode, Json<Self>) {
        (
            StatusCode::UNAUTHORIZED,
            Json(Self::new("Not signed in", "UNAUTHORIZED")),
        )
    }

    fn forbidden() -> (StatusCode, Json<Self>) {
        (
            StatusCode::FORBIDDEN,
            Json(Self::new("Not authorized", "FORBIDDEN")),
        )
    }

    fn internal(msg: impl Into<String>) -> (StatusCode, Json<Self>) {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(Self::new(msg, "INTERNAL_ERROR")),
        )
    }

    fn from_core(err: CoreError) -> (StatusCode, Json<Self>) {
        match &err {
            CoreError::Store(StoreError::NotFound(_)) => Self::not_found(err.to_string()),
            CoreError::Store(StoreError::Conflict(_)) => (
                StatusCode::CONFLICT,
                Json(Self::new(
                    "Snippet was changed since it was read",
                    "CONFLICT",
                )),
            ),
            CoreError::Validation(msg) => Self::bad_request(msg.clone()),
            CoreError::Store(StoreError::Remote { .. } | StoreError::Http(_)) => {
                tracing::error!(error = %err, "Remote store request failed");
                (
                    StatusCode::BAD_GATEWAY,
                    Json(Self::new(err.to_string(), "REMOTE_ERROR")),
                )
            }
            _ => {
                tracing::error!(error = %err, "Request failed");
                Self::internal(err.to_string())
            }
        }
    }
}

/// Writes need a signed-in caller on the allow-list.
fn require_writer(state: &AppState, identity: &Identity) -> ApiResult<()> {
    if !identity.is_signed_in() {
        return Err(ApiError::unauthorized());
    }
    if !state.is_authorized(identity) {
        tracing::warn!(user = ?identity.username, "Rejected write from unauthorized user");
        return Err(ApiError::forbidden());
    }
    Ok(())
}

/// Load the current snippet and check the caller may see it.
async fn load_visible(
    state: &AppState,
    vault: &Vault,
    identity: &Identity,
    id: &SnippetId,
) -> ApiResult<Snippet> {
    let snippet = vault
        .snippets()
        .get(id)
        .await
        .map_err(ApiError::from_core)?
        .ok_or_else(|| ApiError::not_found(format!("Snippet not found: {id}")))?;

    if !state.can_view(identity, &snippet) {
        return Err(ApiError::forbidden());
    }
    Ok(snippet)
}

fn parse_body<T>(body: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

// =============================================================================
// Global endpoints
// =============================================================================

/// Health check endpoint.
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "healthy": true,
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// =============================================================================
// Snippet endpoints
// =============================================================================

#[derive(Debug, Serialize)]
struct SnippetListResponse {
    snippets: Vec<Snippet>,
}

#[derive(Debug, Serialize)]
struct SnippetResponse {
    snippet: Snippet,
}

/// Body of `PUT /api/snippets/{id}`.
#[derive(Debug, Deserialize)]
struct UpdateRequest {
    #[serde(flatten)]
    input: SnippetInput,
    /// Version token from the read the edit was based on.
    #[serde(default)]
    version: Option<String>,
}

/// List snippets the caller may see.
async fn snippet_list(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<impl IntoResponse> {
    let vault = state.vault(&identity);
    let snippets: Vec<Snippet> = vault
        .snippets()
        .list()
        .await
        .map_err(ApiError::from_core)?
        .into_iter()
        .filter(|s| state.can_view(&identity, s))
        .collect();

    Ok(Json(SnippetListResponse { snippets }))
}

/// Create a snippet.
async fn snippet_create(
    State(state): State<AppState>,
    identity: Identity,
    body: Result<Json<SnippetInput>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    require_writer(&state, &identity)?;
    let input = parse_body(body)?;

    let snippet = state
        .vault(&identity)
        .snippets()
        .create(&input)
        .await
        .map_err(ApiError::from_core)?;

    tracing::info!(id = %snippet.id, user = ?identity.username, "Created snippet");
    Ok(Json(SnippetResponse { snippet }))
}

/// Get a snippet.
async fn snippet_get(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = SnippetId::from_string(id);
    let vault = state.vault(&identity);
    let snippet = load_visible(&state, &vault, &identity, &id).await?;
    Ok(Json(SnippetResponse { snippet }))
}

/// Replace a snippet's metadata and files.
async fn snippet_update(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
    body: Result<Json<UpdateRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    require_writer(&state, &identity)?;
    let request = parse_body(body)?;
    let id = SnippetId::from_string(id);

    let snippet = state
        .vault(&identity)
        .snippets()
        .update(&id, &request.input, request.version.as_deref())
        .await
        .map_err(ApiError::from_core)?
        .ok_or_else(|| ApiError::not_found(format!("Snippet not found: {id}")))?;

    tracing::info!(id = %id, user = ?identity.username, "Updated snippet");
    Ok(Json(SnippetResponse { snippet }))
}

/// Delete a snippet.
async fn snippet_delete(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    require_writer(&state, &identity)?;
    let id = SnippetId::from_string(id);

    let deleted = state
        .vault(&identity)
        .snippets()
        .delete(&id)
        .await
        .map_err(ApiError::from_core)?;
    if !deleted {
        return Err(ApiError::not_found(format!("Snippet not found: {id}")));
    }

    tracing::info!(id = %id, user = ?identity.username, "Deleted snippet");
    Ok(Json(serde_json::json!({ "success": true })))
}

// =============================================================================
// Revision endpoints
// =============================================================================

/// A changed file with its patch split into typed lines.
#[derive(Debug, Serialize)]
struct FileDiffView {
    #[serde(flatten)]
    change: FileChange,
    lines: Vec<PatchLine>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DiffView {
    sha: String,
    parent_sha: String,
    files: Vec<FileDiffView>,
}

/// Revision history of a snippet, newest first.
async fn revision_list(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = SnippetId::from_string(id);
    let vault = state.vault(&identity);
    load_visible(&state, &vault, &identity, &id).await?;

    let revisions = vault
        .history()
        .list_revisions(&id, MAX_REVISIONS)
        .await
        .map_err(ApiError::from_core)?;

    Ok(Json(serde_json::json!({ "revisions": revisions })))
}

/// The snippet as it was at a commit.
async fn revision_snapshot(
    State(state): State<AppState>,
    identity: Identity,
    Path((id, sha)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let id = SnippetId::from_string(id);
    let vault = state.vault(&identity);
    load_visible(&state, &vault, &identity, &id).await?;

    let snippet = vault
        .revisions()
        .get_snapshot(&id, &sha)
        .await
        .map_err(ApiError::from_core)?
        .ok_or_else(|| ApiError::not_found(format!("No snapshot of {id} at {sha}")))?;

    Ok(Json(SnippetResponse { snippet }))
}

/// Changes a commit made to the snippet directory.
async fn revision_diff(
    State(state): State<AppState>,
    identity: Identity,
    Path((id, sha)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let id = SnippetId::from_string(id);
    let vault = state.vault(&identity);
    load_visible(&state, &vault, &identity, &id).await?;

    let diff = vault
        .revisions()
        .get_diff(&id, &sha)
        .await
        .map_err(ApiError::from_core)?
        .ok_or_else(|| ApiError::not_found(format!("Commit not found: {sha}")))?
        .scoped_to(&state.layout.dir(&id));

    let files = diff
        .files
        .into_iter()
        .map(|change| FileDiffView {
            lines: change.patch.as_deref().map(parse_patch).unwrap_or_default(),
            change,
        })
        .collect();

    Ok(Json(serde_json::json!({
        "diff": DiffView {
            sha: diff.sha,
            parent_sha: diff.parent_sha,
            files,
        }
    })))
}
