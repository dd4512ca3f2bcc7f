//! Health check endpoint.

use axum::http::StatusCode;

/// Liveness probe; returns 200 while the server is up
pub async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}
