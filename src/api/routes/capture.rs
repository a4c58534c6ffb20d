//! Capture control endpoints.
//!
//! Provides HTTP endpoints for:
//! - Driving a capture session (POST /capture/:kind/:op)
//! - Reading capture status (GET /capture/:kind/status)
//!
//! Operations are not executed in the handler: they are forwarded over an
//! mpsc channel to the single command loop that owns the machines, so no
//! two operations ever interleave.

use crate::api::error::{ApiError, ApiResult};
use crate::capture::{CaptureOp, CaptureStatusHandle};
use crate::media::MediaKind;
use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::info;

/// A capture operation addressed to one machine.
#[derive(Debug, Clone, Copy)]
pub struct CaptureCommand {
    pub kind: MediaKind,
    pub op: CaptureOp,
}

#[derive(Clone)]
pub struct CaptureState {
    pub tx: mpsc::Sender<CaptureCommand>,
    pub statuses: HashMap<MediaKind, CaptureStatusHandle>,
}

impl CaptureState {
    fn status(&self, kind: MediaKind) -> ApiResult<&CaptureStatusHandle> {
        self.statuses
            .get(&kind)
            .ok_or_else(|| ApiError::internal(format!("no machine for kind {}", kind)))
    }
}

/// Creates the capture router with all capture-related endpoints.
pub fn router(state: CaptureState) -> Router {
    Router::new()
        .route("/capture/:kind/status", get(capture_status))
        .route("/capture/:kind/:op", post(capture_op))
        .with_state(state)
}

fn parse_kind(kind: &str) -> ApiResult<MediaKind> {
    kind.parse::<MediaKind>()
        .map_err(|e| ApiError::bad_request(e.to_string()))
}

/// Enqueue a capture operation and report the resulting status.
async fn capture_op(
    State(state): State<CaptureState>,
    Path((kind, op)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let kind = parse_kind(&kind)?;
    let op = op
        .parse::<CaptureOp>()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    info!(
        "{} {} command received via API",
        kind.as_str(),
        op.as_str()
    );

    state
        .tx
        .send(CaptureCommand { kind, op })
        .await
        .map_err(|e| ApiError::internal(format!("Failed to send capture command: {}", e)))?;

    // Small delay to allow the command loop to update the status.
    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

    let status = state.status(kind)?.get().await;
    Ok(Json(json!({
        "success": true,
        "kind": kind.as_str(),
        "op": op.as_str(),
        "phase": status.phase.as_str(),
        "session_id": status.session_id.map(|id| id.to_string()),
        "pending_file_name": status.pending_file_name,
        "last_error": status.last_error,
    })))
}

/// Gets the current capture status for one medium.
async fn capture_status(
    State(state): State<CaptureState>,
    Path(kind): Path<String>,
) -> ApiResult<Json<Value>> {
    let kind = parse_kind(&kind)?;
    let status = state.status(kind)?.get().await;

    Ok(Json(json!({
        "kind": kind.as_str(),
        "phase": status.phase.as_str(),
        "session_id": status.session_id.map(|id| id.to_string()),
        "pending_file_name": status.pending_file_name,
        "pending_size_bytes": status.pending_size_bytes,
        "last_error": status.last_error,
    })))
}
