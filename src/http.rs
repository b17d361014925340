//! HTTP controller exposing the path handler as JSON endpoints.
//!
//! Every route shares one [`PathHandler`], so cache state is common to all
//! clients. Timeouts are answered with `408` and a result carrying
//! `TIMEOUT_ERROR`; an unusable argument is answered with `400`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::HttpConfig;
use crate::models::{PermissionResult, ValidationResult};
use crate::path::{PathHandler, ValidateOptions};
use crate::{AppError, Result};

/// Body accepted by the path endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathRequest {
    /// Path to operate on.
    pub path: String,
    /// Per-call deadline in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Base directory for `/api/path/resolve`.
    #[serde(default)]
    pub base_path: Option<String>,
}

impl PathRequest {
    fn options(&self) -> ValidateOptions {
        ValidateOptions {
            timeout: self.timeout_ms.map(Duration::from_millis),
            ..ValidateOptions::default()
        }
    }

    fn effective_timeout_ms(&self, handler: &PathHandler) -> u64 {
        self.timeout_ms.unwrap_or_else(|| {
            u64::try_from(handler.default_timeout().as_millis()).unwrap_or(u64::MAX)
        })
    }
}

/// Body accepted by `/api/path/cache/invalidate`.
#[derive(Debug, Deserialize)]
pub struct InvalidateRequest {
    /// Exact path to drop, raw or normalized.
    #[serde(default)]
    pub path: Option<String>,
    /// Regex matched against cached paths.
    #[serde(default)]
    pub pattern: Option<String>,
}

type Shared = State<Arc<PathHandler>>;

/// Handler for `GET /health`.
async fn health() -> &'static str {
    "ok"
}

fn error_response(err: &AppError) -> Response {
    let status = match err {
        AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        AppError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

fn validation_response(
    outcome: Result<ValidationResult>,
    request: &PathRequest,
    handler: &PathHandler,
) -> Response {
    match outcome {
        Ok(result) => Json(result).into_response(),
        Err(AppError::Timeout(reason)) => {
            warn!(%reason, path = %request.path, "validation request timed out");
            let body = ValidationResult::timed_out(request.effective_timeout_ms(handler));
            (StatusCode::REQUEST_TIMEOUT, Json(body)).into_response()
        }
        Err(err) => error_response(&err),
    }
}

async fn validate_path(State(handler): Shared, Json(request): Json<PathRequest>) -> Response {
    let outcome = handler.validate_path(&request.path, &request.options()).await;
    validation_response(outcome, &request, &handler)
}

async fn validate_repository(
    State(handler): Shared,
    Json(request): Json<PathRequest>,
) -> Response {
    let outcome = handler
        .validate_repository_root(&request.path, &request.options())
        .await;
    validation_response(outcome, &request, &handler)
}

async fn check_permissions(State(handler): Shared, Json(request): Json<PathRequest>) -> Response {
    match handler
        .check_permissions(&request.path, &request.options())
        .await
    {
        Ok(result) => Json(result).into_response(),
        Err(AppError::Timeout(reason)) => {
            warn!(%reason, path = %request.path, "permission request timed out");
            let body = PermissionResult::timed_out(request.effective_timeout_ms(&handler));
            (StatusCode::REQUEST_TIMEOUT, Json(body)).into_response()
        }
        Err(err) => error_response(&err),
    }
}

async fn normalize_path(State(handler): Shared, Json(request): Json<PathRequest>) -> Response {
    match handler.normalize_path(&request.path) {
        Ok(normalized) => Json(json!({ "normalizedPath": normalized })).into_response(),
        Err(err) => error_response(&err),
    }
}

async fn resolve_path(State(handler): Shared, Json(request): Json<PathRequest>) -> Response {
    match handler.resolve_relative_path(&request.path, request.base_path.as_deref()) {
        Ok(resolved) => Json(json!({ "resolvedPath": resolved })).into_response(),
        Err(err) => error_response(&err),
    }
}

async fn cache_stats(State(handler): Shared) -> Response {
    Json(handler.cache_stats()).into_response()
}

async fn clear_cache(State(handler): Shared) -> StatusCode {
    handler.clear_cache();
    StatusCode::NO_CONTENT
}

async fn invalidate_cache(
    State(handler): Shared,
    Json(request): Json<InvalidateRequest>,
) -> Response {
    if request.path.is_none() && request.pattern.is_none() {
        return error_response(&AppError::InvalidArgument(
            "either path or pattern is required".into(),
        ));
    }
    let mut removed = 0;
    if let Some(path) = &request.path {
        removed += handler.invalidate_path(path);
    }
    if let Some(pattern) = &request.pattern {
        match handler.invalidate_pattern(pattern) {
            Ok(count) => removed += count,
            Err(err) => return error_response(&err),
        }
    }
    Json(json!({ "removed": removed })).into_response()
}

/// Routes served by the controller.
#[must_use]
pub fn router(handler: Arc<PathHandler>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/path/validate", post(validate_path))
        .route("/api/path/repository", post(validate_repository))
        .route("/api/path/permissions", post(check_permissions))
        .route("/api/path/normalize", post(normalize_path))
        .route("/api/path/resolve", post(resolve_path))
        .route("/api/path/cache/stats", get(cache_stats))
        .route("/api/path/cache", delete(clear_cache))
        .route("/api/path/cache/invalidate", post(invalidate_cache))
        .with_state(handler)
}

/// Bind `config.bind:config.port` and serve until `ct` is cancelled.
///
/// # Errors
///
/// Returns `AppError::Http` if the address cannot be bound or the server
/// fails.
pub async fn serve(
    handler: Arc<PathHandler>,
    config: &HttpConfig,
    ct: CancellationToken,
) -> Result<()> {
    let listener = TcpListener::bind((config.bind.as_str(), config.port))
        .await
        .map_err(|err| {
            AppError::Http(format!(
                "failed to bind {}:{}: {err}",
                config.bind, config.port
            ))
        })?;
    serve_listener(listener, handler, ct).await
}

/// Serve on an already bound listener until `ct` is cancelled.
///
/// # Errors
///
/// Returns `AppError::Http` if the server fails.
pub async fn serve_listener(
    listener: TcpListener,
    handler: Arc<PathHandler>,
    ct: CancellationToken,
) -> Result<()> {
    let addr: Option<SocketAddr> = listener.local_addr().ok();
    info!(?addr, platform = %handler.profile(), "starting HTTP controller");

    axum::serve(listener, router(handler))
        .with_graceful_shutdown(async move { ct.cancelled().await })
        .await
        .map_err(|err| AppError::Http(format!("server error: {err}")))?;

    info!("HTTP controller shut down");
    Ok(())
}
