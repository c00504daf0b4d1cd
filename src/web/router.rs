//! Router configuration for Web API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use super::handlers::{
    delete_file, delete_multiple_files, download_file, list_files, upload_files, view_file,
    AppState,
};
use super::middleware::security_headers;
use crate::config::StorageConfig;

/// Create the main API router.
///
/// The upload body limit follows `storage.max_upload_size_mb`; zero lifts
/// axum's default limit entirely.
pub fn create_router(app_state: Arc<AppState>, storage: &StorageConfig) -> Router {
    let body_limit = match storage.max_upload_bytes() {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    let file_routes = Router::new()
        .route("/files", get(list_files))
        .route("/upload", post(upload_files))
        .route("/download/:id", get(download_file))
        .route("/view/:id", get(view_file))
        .route("/delete", post(delete_file))
        .route("/delete-multiple", post(delete_multiple_files));

    file_routes
        .layer(body_limit)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(security_headers)),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

/// Create a router serving the browser UI from `static_path`.
///
/// `/` serves `index.html` and everything else in the directory is
/// reachable under `/static`. Returns `None` when the directory is missing.
pub fn create_static_router(static_path: &str) -> Option<Router> {
    let dir = Path::new(static_path);
    if !dir.is_dir() {
        tracing::warn!(
            path = %static_path,
            "Static directory not found, browser UI will not be served"
        );
        return None;
    }

    let index = dir.join("index.html");

    Some(
        Router::new()
            .route_service("/", ServeFile::new(index))
            .nest_service("/static", ServeDir::new(dir))
            .layer(middleware::from_fn(security_headers)),
    )
}
