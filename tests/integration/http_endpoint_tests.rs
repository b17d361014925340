//! Integration tests for the HTTP controller.
//!
//! Each test binds an ephemeral port and drives the routes with `reqwest`.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use repo_path_guard::http::serve_listener;

use super::test_helpers::{path_string, posix_handler};

/// Spawn the controller on an ephemeral port, returning the base URL.
///
/// Caller must cancel `ct` to shut the server down.
async fn spawn_server() -> (String, CancellationToken) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral");
    let port = listener.local_addr().expect("local addr").port();
    let ct = CancellationToken::new();

    let server_ct = ct.clone();
    tokio::spawn(async move {
        let _ = serve_listener(listener, Arc::new(posix_handler()), server_ct).await;
    });

    (format!("http://127.0.0.1:{port}"), ct)
}

async fn post(base_url: &str, route: &str, body: Value) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .post(format!("{base_url}{route}"))
        .json(&body)
        .send()
        .await
        .expect("HTTP POST");
    let status = resp.status().as_u16();
    let body = resp.json::<Value>().await.expect("json body");
    (status, body)
}

// ── Health ───────────────────────────────────────────────────

#[tokio::test]
async fn health_returns_ok() {
    let (base_url, ct) = spawn_server().await;

    let resp = reqwest::get(format!("{base_url}/health"))
        .await
        .expect("HTTP GET /health");
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.expect("body"), "ok");

    ct.cancel();
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let (base_url, ct) = spawn_server().await;
    let resp = reqwest::get(format!("{base_url}/nonexistent"))
        .await
        .expect("HTTP GET");
    assert_eq!(resp.status(), 404);
    ct.cancel();
}

// ── Validation routes ────────────────────────────────────────

#[tokio::test]
async fn validate_existing_directory() {
    let temp = tempfile::tempdir().expect("tempdir");
    let (base_url, ct) = spawn_server().await;

    let (status, body) = post(
        &base_url,
        "/api/path/validate",
        json!({ "path": path_string(temp.path()) }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["isValid"], true);
    assert_eq!(body["normalizedPath"], path_string(temp.path()));
    assert_eq!(body["metadata"]["exists"], true);
    assert_eq!(body["metadata"]["isDirectory"], true);
    ct.cancel();
}

#[tokio::test]
async fn validate_reports_errors_in_band() {
    let (base_url, ct) = spawn_server().await;

    let (status, body) = post(&base_url, "/api/path/validate", json!({ "path": "" })).await;

    assert_eq!(status, 200);
    assert_eq!(body["isValid"], false);
    assert_eq!(body["errors"][0]["code"], "INVALID_INPUT");
    assert!(body["normalizedPath"].is_null());
    ct.cancel();
}

#[tokio::test]
async fn repository_route_rejects_files() {
    let temp = tempfile::tempdir().expect("tempdir");
    let file = temp.path().join("file.txt");
    std::fs::write(&file, b"x").expect("write");
    let (base_url, ct) = spawn_server().await;

    let (status, body) = post(
        &base_url,
        "/api/path/repository",
        json!({ "path": path_string(&file), "timeoutMs": 5000 }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["isValid"], false);
    let codes: Vec<&str> = body["errors"]
        .as_array()
        .expect("errors array")
        .iter()
        .filter_map(|err| err["code"].as_str())
        .collect();
    assert!(codes.contains(&"NOT_DIRECTORY"), "{codes:?}");
    ct.cancel();
}

#[tokio::test]
async fn permissions_route_reports_access() {
    let temp = tempfile::tempdir().expect("tempdir");
    let (base_url, ct) = spawn_server().await;

    let (status, body) = post(
        &base_url,
        "/api/path/permissions",
        json!({ "path": path_string(temp.path()) }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["canRead"], true);
    assert_eq!(body["canWrite"], true);
    assert!(body["errors"].as_array().expect("errors").is_empty());
    ct.cancel();
}

// ── Normalize and resolve ────────────────────────────────────

#[tokio::test]
async fn normalize_route() {
    let (base_url, ct) = spawn_server().await;

    let (status, body) = post(
        &base_url,
        "/api/path/normalize",
        json!({ "path": "/home//user/./repo/../x" }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["normalizedPath"], "/home/user/x");

    let (status, body) = post(&base_url, "/api/path/normalize", json!({ "path": "" })).await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().is_some());
    ct.cancel();
}

#[tokio::test]
async fn resolve_route_uses_base_path() {
    let (base_url, ct) = spawn_server().await;

    let (status, body) = post(
        &base_url,
        "/api/path/resolve",
        json!({ "path": "../sibling", "basePath": "/work/repo" }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["resolvedPath"], "/work/sibling");
    ct.cancel();
}

// ── Cache management ─────────────────────────────────────────

#[tokio::test]
async fn cache_routes_report_and_drop_entries() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = path_string(temp.path());
    let (base_url, ct) = spawn_server().await;
    let client = reqwest::Client::new();

    for _ in 0..2 {
        post(&base_url, "/api/path/validate", json!({ "path": path })).await;
    }

    let stats: Value = client
        .get(format!("{base_url}/api/path/cache/stats"))
        .send()
        .await
        .expect("stats")
        .json()
        .await
        .expect("stats json");
    assert_eq!(stats["hits"], 1);
    assert_eq!(stats["size"], 1);

    let (status, body) = post(
        &base_url,
        "/api/path/cache/invalidate",
        json!({ "path": path }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["removed"], 1);

    post(&base_url, "/api/path/validate", json!({ "path": path })).await;
    let resp = client
        .delete(format!("{base_url}/api/path/cache"))
        .send()
        .await
        .expect("delete");
    assert_eq!(resp.status(), 204);

    let stats: Value = client
        .get(format!("{base_url}/api/path/cache/stats"))
        .send()
        .await
        .expect("stats")
        .json()
        .await
        .expect("stats json");
    assert_eq!(stats["size"], 0);
    ct.cancel();
}

#[tokio::test]
async fn invalidate_requires_path_or_pattern() {
    let (base_url, ct) = spawn_server().await;

    let (status, _) = post(&base_url, "/api/path/cache/invalidate", json!({})).await;
    assert_eq!(status, 400);

    let (status, body) = post(
        &base_url,
        "/api/path/cache/invalidate",
        json!({ "pattern": "(" }),
    )
    .await;
    assert_eq!(status, 400);
    assert!(body["error"]
        .as_str()
        .is_some_and(|msg| msg.starts_with("invalid argument")));

    let (status, body) = post(
        &base_url,
        "/api/path/cache/invalidate",
        json!({ "pattern": "^/nothing" }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["removed"], 0);
    ct.cancel();
}
