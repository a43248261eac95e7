//! HTTP API tests against a seeded memory store.

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use snipvault_core::AccessPolicy;
use snipvault_server::{create_router, AppState, USER_HEADER};
use snipvault_test_utils::assertions::assert_error_code;
use snipvault_test_utils::fixtures::{seeded_store, Seeded};
use std::sync::Arc;
use tower::ServiceExt;

fn app(seeded: &Seeded) -> Router {
    create_router(AppState::new(
        Arc::new(seeded.store.clone()),
        seeded.layout.clone(),
        AccessPolicy::from_allow_list(["alice"]),
    ))
}

enum Caller {
    Anonymous,
    User(&'static str),
    /// Names a user without presenting a credential.
    Claimed(&'static str),
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    caller: Caller,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    match caller {
        Caller::Anonymous => {}
        Caller::User(name) => {
            request = request
                .header(header::AUTHORIZATION, "Bearer gho_test")
                .header(USER_HEADER, name);
        }
        Caller::Claimed(name) => request = request.header(USER_HEADER, name),
    }
    let body = match body {
        Some(value) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn new_snippet(title: &str) -> Value {
    json!({
        "title": title,
        "description": "From the API",
        "tags": ["api"],
        "isPublic": true,
        "files": [{"filename": "main.py", "code": "print('hi')\n"}]
    })
}

#[tokio::test]
async fn health_reports_version() {
    let seeded = seeded_store(0).await;
    let (status, body) = send(&app(&seeded), Method::GET, "/health", Caller::Anonymous, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["healthy"], true);
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn listing_hides_private_snippets_from_unauthorized_callers() {
    let seeded = seeded_store(4).await;
    let app = app(&seeded);

    let (status, body) = send(&app, Method::GET, "/api/snippets", Caller::Anonymous, None).await;
    assert_eq!(status, StatusCode::OK);
    let listed = body["snippets"].as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|s| s["isPublic"] == true));

    let (_, body) = send(&app, Method::GET, "/api/snippets", Caller::User("mallory"), None).await;
    assert_eq!(body["snippets"].as_array().unwrap().len(), 2);

    let (_, body) = send(&app, Method::GET, "/api/snippets", Caller::User("alice"), None).await;
    assert_eq!(body["snippets"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn get_checks_existence_then_visibility() {
    let seeded = seeded_store(2).await;
    let app = app(&seeded);
    let public = format!("/api/snippets/{}", seeded.snippets[0].id);
    let private = format!("/api/snippets/{}", seeded.snippets[1].id);

    let (status, body) = send(&app, Method::GET, &public, Caller::Anonymous, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["snippet"]["title"], "Snippet 0");
    assert_eq!(body["snippet"]["files"][0]["language"], "rust");
    assert!(body["snippet"]["version"].is_string());

    let (status, body) = send(&app, Method::GET, &private, Caller::Anonymous, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_error_code(&body, "FORBIDDEN");

    let (status, _) = send(&app, Method::GET, &private, Caller::User("alice"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::GET, "/api/snippets/missing", Caller::User("alice"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_error_code(&body, "NOT_FOUND");
}

#[tokio::test]
async fn writes_require_identity_then_authorization_then_valid_input() {
    let seeded = seeded_store(0).await;
    let app = app(&seeded);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/snippets/new",
        Caller::Anonymous,
        Some(new_snippet("x")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_error_code(&body, "UNAUTHORIZED");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/snippets/new",
        Caller::User("mallory"),
        Some(new_snippet("x")),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/snippets/new",
        Caller::User("alice"),
        Some(json!({"files": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_code(&body, "BAD_REQUEST");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/snippets/new",
        Caller::User("alice"),
        Some(json!({"title": "No files", "files": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(seeded.store.commit_count(), 0);
}

#[tokio::test]
async fn created_snippet_is_readable_and_editable() {
    let seeded = seeded_store(0).await;
    let app = app(&seeded);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/snippets/new",
        Caller::User("alice"),
        Some(new_snippet("Greeter")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["snippet"]["id"].as_str().unwrap().to_string();
    let version = body["snippet"]["version"].clone();
    assert_eq!(body["snippet"]["files"][0]["language"], "python");

    let mut edit = new_snippet("Greeter v2");
    edit["version"] = version.clone();
    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/snippets/{id}"),
        Caller::User("alice"),
        Some(edit),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["snippet"]["title"], "Greeter v2");

    // A second edit based on the same read is stale.
    let mut stale = new_snippet("Greeter v3");
    stale["version"] = version;
    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/snippets/{id}"),
        Caller::User("alice"),
        Some(stale),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_error_code(&body, "CONFLICT");

    let (_, body) = send(&app, Method::GET, &format!("/api/snippets/{id}"), Caller::Anonymous, None).await;
    assert_eq!(body["snippet"]["title"], "Greeter v2");
}

#[tokio::test]
async fn update_of_missing_snippet_is_not_found() {
    let seeded = seeded_store(0).await;
    let (status, _) = send(
        &app(&seeded),
        Method::PUT,
        "/api/snippets/nope",
        Caller::User("alice"),
        Some(new_snippet("x")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_removes_snippet() {
    let seeded = seeded_store(2).await;
    let app = app(&seeded);
    let uri = format!("/api/snippets/{}", seeded.snippets[0].id);

    let (status, _) = send(&app, Method::DELETE, &uri, Caller::Anonymous, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, Method::DELETE, &uri, Caller::User("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _) = send(&app, Method::GET, &uri, Caller::User("alice"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, Method::DELETE, &uri, Caller::User("alice"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn revisions_snapshot_and_diff() {
    let seeded = seeded_store(1).await;
    let app = app(&seeded);
    let id = &seeded.snippets[0].id;

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/snippets/{id}/revisions"),
        Caller::Anonymous,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let revisions = body["revisions"].as_array().unwrap();
    assert_eq!(revisions.len(), 3);
    let root = revisions.last().unwrap();
    assert_eq!(root["kind"], "create");
    let root_sha = root["sha"].as_str().unwrap();

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/snippets/{id}/revisions/{root_sha}"),
        Caller::Anonymous,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["snippet"]["title"], "Snippet 0");
    assert_eq!(body["snippet"]["files"].as_array().unwrap().len(), 0);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/snippets/{id}/revisions/{root_sha}/diff"),
        Caller::Anonymous,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let diff = &body["diff"];
    assert_eq!(diff["parentSha"], "");
    let files = diff["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["status"], "added");
    assert!(files[0]["filename"].as_str().unwrap().ends_with("/index.md"));

    let lines = files[0]["lines"].as_array().unwrap();
    assert!(lines[0]["content"].as_str().unwrap().starts_with("@@"));
    assert!(lines[0].get("newLine").is_none());
    assert!(lines[1..].iter().all(|l| l["kind"] == "addition"));
    assert_eq!(lines[1]["newLine"], 1);
}

#[tokio::test]
async fn private_history_is_forbidden_and_unknown_commit_is_not_found() {
    let seeded = seeded_store(2).await;
    let app = app(&seeded);
    let private = &seeded.snippets[1].id;
    let public = &seeded.snippets[0].id;

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/snippets/{private}/revisions"),
        Caller::Anonymous,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/snippets/{public}/revisions/deadbeef/diff"),
        Caller::Anonymous,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn user_header_without_credential_cannot_read_private_snippets() {
    let seeded = seeded_store(2).await;
    let app = app(&seeded);
    let private = &seeded.snippets[1].id;
    let commits = seeded.store.commit_count();

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/snippets/{private}"),
        Caller::Claimed("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_error_code(&body, "FORBIDDEN");

    let (_, body) = send(&app, Method::GET, "/api/snippets", Caller::Claimed("alice"), None).await;
    let listed = body["snippets"].as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed.iter().all(|s| s["isPublic"] == true));

    for suffix in ["revisions", "revisions/deadbeef", "revisions/deadbeef/diff"] {
        let (status, _) = send(
            &app,
            Method::GET,
            &format!("/api/snippets/{private}/{suffix}"),
            Caller::Claimed("alice"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{suffix}");
    }

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/snippets/{private}"),
        Caller::Claimed("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(seeded.store.commit_count(), commits);
}

#[tokio::test]
async fn store_failure_is_bad_gateway() {
    let seeded = seeded_store(0).await;
    seeded.store.fail_after(0);
    let (status, body) = send(
        &app(&seeded),
        Method::POST,
        "/api/snippets/new",
        Caller::User("alice"),
        Some(new_snippet("x")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_error_code(&body, "REMOTE_ERROR");
}
