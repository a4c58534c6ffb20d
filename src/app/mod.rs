use crate::api::{ApiServer, CaptureCommand};
use crate::capture::{CaptureMachine, CaptureStatusHandle};
use crate::config::{CaptureConfig, Config};
use crate::media::{CameraSource, MediaKind, MediaSource, MicSource};
use crate::store::ArtifactStore;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

pub async fn run_service() -> Result<()> {
    info!("Starting clipshot service");

    let config = Config::load()?;
    let store = Arc::new(ArtifactStore::open(
        config.captures_dir()?,
        config.db_path()?,
    )?);

    let (tx, mut rx) = mpsc::channel::<CaptureCommand>(10);

    let mut machines: HashMap<MediaKind, CaptureMachine> = HashMap::new();
    let mut statuses: HashMap<MediaKind, CaptureStatusHandle> = HashMap::new();
    for kind in MediaKind::ALL {
        let status = CaptureStatusHandle::default();
        let machine = CaptureMachine::new(
            kind,
            build_source(kind, &config.capture),
            store.clone(),
            status.clone(),
        );
        machines.insert(kind, machine);
        statuses.insert(kind, status);
    }

    let api_server = ApiServer::new(tx, statuses, store.clone(), &config);
    let port = config.api.port;
    tokio::spawn(async move {
        if let Err(e) = api_server.start().await {
            error!("API server failed: {}", e);
        }
    });

    info!("clipshot is ready!");
    info!(
        "Try: curl -X POST http://127.0.0.1:{}/capture/audio/start",
        port
    );

    // Single command loop: operations on the machines never interleave.
    while let Some(command) = rx.recv().await {
        match machines.get_mut(&command.kind) {
            Some(machine) => match machine.handle(command.op).await {
                Ok(phase) => info!(
                    "{} {} -> {}",
                    command.kind.as_str(),
                    command.op.as_str(),
                    phase.as_str()
                ),
                Err(e) => error!(
                    "{} {} failed: {}",
                    command.kind.as_str(),
                    command.op.as_str(),
                    e
                ),
            },
            None => error!("No capture machine for kind {}", command.kind.as_str()),
        }
    }

    for machine in machines.values_mut() {
        machine.teardown().await;
    }

    Ok(())
}

fn build_source(kind: MediaKind, capture: &CaptureConfig) -> Box<dyn MediaSource> {
    match kind {
        MediaKind::Audio => Box::new(MicSource::new(capture.sample_rate)),
        MediaKind::Photo | MediaKind::Video => Box::new(CameraSource::new(
            capture.camera_device.clone(),
            capture.video_width,
            capture.video_height,
        )),
    }
}
