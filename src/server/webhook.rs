//! Webhook endpoint handler.
//!
//! Verifies the delivery signature against the raw body, filters the event,
//! and spawns the pipeline as a detached task. The response only reports
//! acceptance; run outcomes are observable through the logs and the history
//! ledger, never through this endpoint.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, info};

use super::AppState;
use crate::domain::PushPayload;
use crate::webhook::{decide, verify_signature, FilterDecision};

const HEADER_EVENT: &str = "x-github-event";
const HEADER_SIGNATURE: &str = "x-hub-signature-256";

/// Rejections produced while processing a delivery
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Missing or invalid signature
    #[error("invalid signature")]
    InvalidSignature,

    /// Body is not a valid push payload
    #[error("invalid JSON payload")]
    InvalidJson(#[from] serde_json::Error),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebhookError::InvalidSignature => StatusCode::UNAUTHORIZED,
            WebhookError::InvalidJson(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(json!({ "ok": false, "error": self.to_string() }));
        (status, body).into_response()
    }
}

fn accepted(body: Value) -> (StatusCode, Json<Value>) {
    (StatusCode::ACCEPTED, Json(body))
}

/// Webhook handler.
///
/// Signature verification runs over the body bytes exactly as received,
/// before any parsing. Valid push events with a processable commit return
/// 202 immediately while the pipeline runs in the background.
pub async fn webhook_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), WebhookError> {
    let signature = headers
        .get(HEADER_SIGNATURE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if !verify_signature(&body, signature, app_state.webhook_secret()) {
        return Err(WebhookError::InvalidSignature);
    }

    let event = headers
        .get(HEADER_EVENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    if event != "push" {
        return Ok(accepted(
            json!({ "ok": true, "ignored": format!("event {event}") }),
        ));
    }

    let payload: PushPayload = serde_json::from_slice(&body)?;

    let commit = match decide(&payload) {
        FilterDecision::NoCommit => {
            info!("No commit found in push, ignoring");
            return Ok(accepted(json!({ "ok": true, "ignored": "No commit found" })));
        }
        FilterDecision::SkipRequested => {
            info!("Skipping [skip ci] commit");
            return Ok(accepted(
                json!({ "ok": true, "ignored": "[skip ci] commit" }),
            ));
        }
        FilterDecision::Process(commit) => commit,
    };

    let short_sha = commit.short_sha().to_string();
    let pipeline = app_state.pipeline();

    tokio::spawn(async move {
        if let Err(err) = pipeline.process_push(payload, commit).await {
            error!(?err, "Pipeline run failed");
        }
    });

    Ok(accepted(
        json!({ "ok": true, "accepted": true, "commit": short_sha }),
    ))
}
