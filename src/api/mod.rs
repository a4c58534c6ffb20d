//! REST API server for clipshot.
//!
//! Provides HTTP endpoints for:
//! - Capture control per medium (open/start/stop/snap/save/discard)
//! - Capture status
//! - Artifact listing and download
//! - The (inert) delete affordance

pub mod error;
pub mod routes;

use crate::capture::CaptureStatusHandle;
use crate::config::Config;
use crate::media::MediaKind;
use crate::store::ArtifactStore;
use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::info;

pub use routes::capture::{CaptureCommand, CaptureState};

pub struct ApiServer {
    port: u16,
    capture_state: CaptureState,
    artifacts_state: routes::artifacts::ArtifactsState,
}

impl ApiServer {
    pub fn new(
        tx: tokio::sync::mpsc::Sender<CaptureCommand>,
        statuses: HashMap<MediaKind, CaptureStatusHandle>,
        store: Arc<ArtifactStore>,
        config: &Config,
    ) -> Self {
        Self {
            port: config.api.port,
            capture_state: CaptureState { tx, statuses },
            artifacts_state: routes::artifacts::ArtifactsState { store },
        }
    }

    pub async fn start(self) -> Result<()> {
        let app = Router::new()
            // Root and version endpoints
            .route("/", get(status))
            .route("/version", get(version))
            // Capture control endpoints
            .merge(routes::capture::router(self.capture_state))
            // Artifact endpoints
            .merge(routes::artifacts::router(self.artifacts_state))
            .layer(ServiceBuilder::new());

        let listener = tokio::net::TcpListener::bind(&format!("127.0.0.1:{}", self.port)).await?;

        info!("API server listening on http://127.0.0.1:{}", self.port);
        info!("Endpoints:");
        info!("  GET    /                          - Service info");
        info!("  GET    /version                   - Version info");
        info!("  POST   /capture/:kind/:op         - Capture op (open|start|stop|snap|save|discard)");
        info!("  GET    /capture/:kind/status      - Capture status");
        info!("  GET    /artifacts/:kind           - List artifacts, newest first");
        info!("  GET    /artifacts/:kind/:filename - Download artifact");
        info!("  DELETE /artifacts/:kind/:filename - Delete (not supported, logs only)");

        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn status() -> Json<Value> {
    Json(json!({
        "service": "clipshot",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn version() -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "name": "clipshot"
    }))
}
