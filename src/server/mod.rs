//! HTTP server for the karaoke pipeline.
//!
//! One endpoint accepts signed GitHub webhook deliveries and kicks off
//! detached pipeline runs; a health endpoint serves liveness probes.
//!
//! # Endpoints
//!
//! - `POST /webhook` - push event intake (202 on accept and on ignore)
//! - `GET /health` - returns 200 if the server is running

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::core::Pipeline;

pub mod health;
pub mod webhook;

pub use health::health_handler;
pub use webhook::webhook_handler;

/// Shared application state, passed to handlers via Axum's `State` extractor
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Secret for HMAC-SHA256 signature verification
    webhook_secret: Vec<u8>,

    /// Pipeline shared across runs (owns the model loader and the ledger)
    pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(webhook_secret: impl Into<Vec<u8>>, pipeline: Arc<Pipeline>) -> Self {
        AppState {
            inner: Arc::new(AppStateInner {
                webhook_secret: webhook_secret.into(),
                pipeline,
            }),
        }
    }

    pub fn webhook_secret(&self) -> &[u8] {
        &self.inner.webhook_secret
    }

    pub fn pipeline(&self) -> Arc<Pipeline> {
        Arc::clone(&self.inner.pipeline)
    }
}

/// Build the axum Router with all endpoints
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/webhook", post(webhook_handler))
        .route("/health", get(health_handler))
        .with_state(app_state)
}

/// Bind and serve until the process is stopped
pub async fn serve(app_state: AppState, port: u16) -> Result<()> {
    let router = build_router(app_state);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!(%addr, "Listening for webhook deliveries");

    axum::serve(listener, router)
        .await
        .context("Server terminated")
}
