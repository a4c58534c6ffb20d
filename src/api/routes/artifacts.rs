//! Artifact listing and download endpoints.
//!
//! Provides HTTP endpoints for:
//! - Listing stored artifacts, newest first (GET /artifacts/:kind)
//! - Downloading a stored blob (GET /artifacts/:kind/:filename)
//! - The delete affordance (DELETE /artifacts/:kind/:filename), which is
//!   deliberately inert: it logs and reports the artifact untouched.

use crate::api::error::{ApiError, ApiResult};
use crate::media::MediaKind;
use crate::store::ArtifactStore;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct ArtifactsState {
    pub store: Arc<ArtifactStore>,
}

pub fn router(state: ArtifactsState) -> Router {
    Router::new()
        .route("/artifacts/:kind", get(list_artifacts))
        .route(
            "/artifacts/:kind/:filename",
            get(download_artifact).delete(delete_artifact),
        )
        .with_state(state)
}

fn parse_kind(kind: &str) -> ApiResult<MediaKind> {
    kind.parse::<MediaKind>()
        .map_err(|e| ApiError::bad_request(e.to_string()))
}

/// GET /artifacts/:kind - list stored artifacts, newest first.
async fn list_artifacts(
    State(state): State<ArtifactsState>,
    Path(kind): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let kind = parse_kind(&kind)?;
    let limit: usize = params
        .get("limit")
        .and_then(|v| v.parse().ok())
        .unwrap_or(50);

    let store = state.store.clone();
    let artifacts = tokio::task::spawn_blocking(move || store.list(kind, limit))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .map_err(ApiError::from)?;

    let entries: Vec<Value> = artifacts
        .iter()
        .map(|a| {
            json!({
                "filename": a.filename,
                "path": a.path,
                "kind": a.kind.as_str(),
                "size_bytes": a.size_bytes,
                "created_at": a.created_at,
            })
        })
        .collect();

    Ok(Json(json!({ "artifacts": entries })))
}

/// GET /artifacts/:kind/:filename - download a stored blob.
async fn download_artifact(
    State(state): State<ArtifactsState>,
    Path((kind, filename)): Path<(String, String)>,
) -> ApiResult<Response> {
    let kind = parse_kind(&kind)?;

    let store = state.store.clone();
    let name = filename.clone();
    let bytes = tokio::task::spawn_blocking(move || store.read_blob(kind, &name))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .map_err(ApiError::from)?;

    let content_type = match kind {
        MediaKind::Audio => "audio/webm",
        MediaKind::Video => "video/webm",
        MediaKind::Photo => "image/png",
    };

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// DELETE /artifacts/:kind/:filename - inert stub.
///
/// The capture UI has always offered deletion without a backing store
/// operation; the store keeps no delete path, so this logs and reports
/// the artifact untouched.
async fn delete_artifact(
    Path((kind, filename)): Path<(String, String)>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let kind = parse_kind(&kind)?;
    warn!(
        "Delete requested for {} artifact {}, deletion is not supported",
        kind.as_str(),
        filename
    );

    Ok((
        StatusCode::NOT_IMPLEMENTED,
        Json(json!({
            "deleted": false,
            "message": "artifact deletion is not supported",
        })),
    ))
}
