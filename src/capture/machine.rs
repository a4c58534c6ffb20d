//! Capture lifecycle state machine.
//!
//! One machine drives all three media kinds through
//! `Idle → Active → Recording → Previewing → Idle`; a per-kind
//! `CapturePolicy` preserves the observable differences between them
//! (whether the device opens separately from capture, and where discard
//! lands). Operations invoked from the wrong phase are ignored with a
//! warning, mirroring the disabled-control semantics of the capture UI.

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::media::{MediaKind, MediaSource, SourceError};
use crate::store::{artifact_file_name, ArtifactStore};

use super::status::{CapturePhase, CaptureStatusHandle};

/// Per-medium transition details.
///
/// Audio acquires the microphone as part of `start` and its discard lands
/// in Idle; photo and video open the camera first and discard re-opens it
/// for another attempt.
#[derive(Debug, Clone, Copy)]
pub struct CapturePolicy {
    pub opens_device_separately: bool,
    pub discard_reopens_device: bool,
}

impl CapturePolicy {
    pub fn for_kind(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Audio => Self {
                opens_device_separately: false,
                discard_reopens_device: false,
            },
            MediaKind::Photo | MediaKind::Video => Self {
                opens_device_separately: true,
                discard_reopens_device: true,
            },
        }
    }
}

/// A capture operation, as carried by API commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOp {
    Open,
    Start,
    Stop,
    Snap,
    Save,
    Discard,
}

impl CaptureOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Snap => "snap",
            Self::Save => "save",
            Self::Discard => "discard",
        }
    }
}

impl std::str::FromStr for CaptureOp {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "snap" => Ok(Self::Snap),
            "save" => Ok(Self::Save),
            "discard" => Ok(Self::Discard),
            _ => anyhow::bail!("Invalid capture operation: {}", s),
        }
    }
}

struct PendingCapture {
    file_name: String,
    blob: Vec<u8>,
}

pub struct CaptureMachine {
    kind: MediaKind,
    policy: CapturePolicy,
    source: Box<dyn MediaSource>,
    store: Arc<ArtifactStore>,
    status: CaptureStatusHandle,
    phase: CapturePhase,
    session_id: Option<Uuid>,
    pending: Option<PendingCapture>,
}

impl CaptureMachine {
    pub fn new(
        kind: MediaKind,
        source: Box<dyn MediaSource>,
        store: Arc<ArtifactStore>,
        status: CaptureStatusHandle,
    ) -> Self {
        Self {
            kind,
            policy: CapturePolicy::for_kind(kind),
            source,
            store,
            status,
            phase: CapturePhase::Idle,
            session_id: None,
            pending: None,
        }
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn phase(&self) -> CapturePhase {
        self.phase
    }

    pub async fn handle(&mut self, op: CaptureOp) -> Result<CapturePhase> {
        match op {
            CaptureOp::Open => self.open().await,
            CaptureOp::Start => self.start().await,
            CaptureOp::Stop => self.stop().await,
            CaptureOp::Snap => self.snap().await,
            CaptureOp::Save => self.confirm_save().await,
            CaptureOp::Discard => self.discard().await,
        }
    }

    /// `Idle → Active` for media that open the device separately.
    pub async fn open(&mut self) -> Result<CapturePhase> {
        if !self.policy.opens_device_separately {
            return self.ignored(CaptureOp::Open);
        }
        if self.phase != CapturePhase::Idle {
            return self.ignored(CaptureOp::Open);
        }

        self.acquire(CapturePhase::Active).await
    }

    /// Audio: `Idle → Recording` (acquire and begin buffering in one step).
    /// Video: `Active → Recording`.
    pub async fn start(&mut self) -> Result<CapturePhase> {
        if self.kind == MediaKind::Photo {
            return self.ignored(CaptureOp::Start);
        }

        if self.policy.opens_device_separately {
            if self.phase != CapturePhase::Active {
                return self.ignored(CaptureOp::Start);
            }
        } else {
            if self.phase != CapturePhase::Idle {
                return self.ignored(CaptureOp::Start);
            }
            if let Err(e) = self.try_open() {
                return self.fail_idle(e.to_string()).await;
            }
            self.session_id = Some(Uuid::new_v4());
        }

        if let Err(e) = self.source.start_capture() {
            self.source.close();
            return self.fail_idle(e.to_string()).await;
        }

        self.phase = CapturePhase::Recording;
        match self.session_id {
            Some(id) => self.status.begin_session(id, CapturePhase::Recording).await,
            None => self.status.set_phase(CapturePhase::Recording).await,
        }
        info!("{} capture started", self.kind.as_str());
        Ok(self.phase)
    }

    /// `Recording → Previewing`: finalize the blob, release the device.
    pub async fn stop(&mut self) -> Result<CapturePhase> {
        if self.phase != CapturePhase::Recording {
            return self.ignored(CaptureOp::Stop);
        }

        let finalized = self.source.finish_capture();
        // The device is released before Previewing on every path.
        self.source.close();

        match finalized {
            Ok(blob) if blob.is_empty() => {
                self.fail_idle("capture produced no data".to_string()).await
            }
            Ok(blob) => self.hold_preview(blob).await,
            Err(e) => self.fail_idle(e.to_string()).await,
        }
    }

    /// Photo `Active → Previewing`: snapshot a frame, release the device.
    pub async fn snap(&mut self) -> Result<CapturePhase> {
        if self.kind != MediaKind::Photo {
            return self.ignored(CaptureOp::Snap);
        }
        if self.phase != CapturePhase::Active {
            return self.ignored(CaptureOp::Snap);
        }

        let snapped = self.source.snapshot();
        self.source.close();

        match snapped {
            Ok(blob) if blob.is_empty() => {
                self.fail_idle("snapshot produced no data".to_string()).await
            }
            Ok(blob) => self.hold_preview(blob).await,
            Err(e) => self.fail_idle(e.to_string()).await,
        }
    }

    /// `Previewing → Idle` on success. On store failure the pending blob
    /// stays in memory and the machine remains in Previewing, so the user
    /// is not forced to recapture.
    pub async fn confirm_save(&mut self) -> Result<CapturePhase> {
        if self.phase != CapturePhase::Previewing {
            return self.ignored(CaptureOp::Save);
        }
        let Some(pending) = self.pending.as_ref() else {
            return self.ignored(CaptureOp::Save);
        };

        match self
            .store
            .save(self.kind, &pending.file_name, &pending.blob)
        {
            Ok(artifact) => {
                info!(
                    "{} artifact saved: {}",
                    self.kind.as_str(),
                    artifact.filename
                );
                self.pending = None;
                self.session_id = None;
                self.phase = CapturePhase::Idle;
                self.status.reset().await;
                Ok(self.phase)
            }
            Err(e) => {
                error!("Failed to save {} artifact: {}", self.kind.as_str(), e);
                self.status
                    .set_error(CapturePhase::Previewing, e.to_string())
                    .await;
                Err(e.into())
            }
        }
    }

    /// `Previewing →` Idle (audio) or Active (photo/video, which re-open
    /// the camera for another attempt). Never touches the store.
    pub async fn discard(&mut self) -> Result<CapturePhase> {
        if self.phase != CapturePhase::Previewing {
            return self.ignored(CaptureOp::Discard);
        }

        self.pending = None;
        self.session_id = None;
        info!("{} capture discarded", self.kind.as_str());

        if self.policy.discard_reopens_device {
            return self.acquire(CapturePhase::Active).await;
        }

        self.phase = CapturePhase::Idle;
        self.status.reset().await;
        Ok(self.phase)
    }

    /// Release everything. Used on service shutdown.
    pub async fn teardown(&mut self) {
        self.source.close();
        self.pending = None;
        self.session_id = None;
        self.phase = CapturePhase::Idle;
        self.status.reset().await;
    }

    async fn acquire(&mut self, on_success: CapturePhase) -> Result<CapturePhase> {
        match self.try_open() {
            Ok(()) => {
                let id = Uuid::new_v4();
                self.session_id = Some(id);
                self.phase = on_success;
                self.status.begin_session(id, on_success).await;
                info!("{} device acquired", self.kind.as_str());
                Ok(self.phase)
            }
            Err(e) => self.fail_idle(e.to_string()).await,
        }
    }

    fn try_open(&mut self) -> Result<(), SourceError> {
        self.source.open().map_err(|e| {
            self.source.close();
            e
        })
    }

    async fn hold_preview(&mut self, blob: Vec<u8>) -> Result<CapturePhase> {
        let file_name = artifact_file_name(self.kind, Utc::now());
        self.status.set_preview(file_name.clone(), blob.len()).await;
        info!(
            "{} capture finalized: {} ({} bytes)",
            self.kind.as_str(),
            file_name,
            blob.len()
        );
        self.pending = Some(PendingCapture { file_name, blob });
        self.phase = CapturePhase::Previewing;
        Ok(self.phase)
    }

    async fn fail_idle(&mut self, message: String) -> Result<CapturePhase> {
        error!("{} capture failed: {}", self.kind.as_str(), message);
        self.pending = None;
        self.session_id = None;
        self.phase = CapturePhase::Idle;
        self.status.set_error(CapturePhase::Idle, message.clone()).await;
        Err(anyhow::anyhow!(message))
    }

    fn ignored(&self, op: CaptureOp) -> Result<CapturePhase> {
        warn!(
            "Ignoring {} for {} while {}",
            op.as_str(),
            self.kind.as_str(),
            self.phase.as_str()
        );
        Ok(self.phase)
    }
}

impl Drop for CaptureMachine {
    fn drop(&mut self) {
        self.source.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeCounters {
        opens: AtomicUsize,
        closes: AtomicUsize,
    }

    struct FakeSource {
        open: bool,
        fail_open: bool,
        blob: Vec<u8>,
        counters: Arc<FakeCounters>,
    }

    impl FakeSource {
        fn new(blob: &[u8]) -> Self {
            Self {
                open: false,
                fail_open: false,
                blob: blob.to_vec(),
                counters: Arc::new(FakeCounters::default()),
            }
        }

        fn failing() -> Self {
            let mut source = Self::new(b"");
            source.fail_open = true;
            source
        }

        fn counters(&self) -> Arc<FakeCounters> {
            self.counters.clone()
        }
    }

    impl MediaSource for FakeSource {
        fn open(&mut self) -> Result<(), SourceError> {
            if self.fail_open {
                return Err(SourceError::DeviceUnavailable("no device".to_string()));
            }
            self.open = true;
            self.counters.opens.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn start_capture(&mut self) -> Result<(), SourceError> {
            if !self.open {
                return Err(SourceError::NotOpen);
            }
            Ok(())
        }

        fn finish_capture(&mut self) -> Result<Vec<u8>, SourceError> {
            if !self.open {
                return Err(SourceError::NotOpen);
            }
            Ok(self.blob.clone())
        }

        fn snapshot(&mut self) -> Result<Vec<u8>, SourceError> {
            if !self.open {
                return Err(SourceError::NotOpen);
            }
            Ok(self.blob.clone())
        }

        fn close(&mut self) {
            if self.open {
                self.open = false;
                self.counters.closes.fetch_add(1, Ordering::SeqCst);
            }
        }

        fn is_open(&self) -> bool {
            self.open
        }
    }

    fn setup_store() -> (TempDir, Arc<ArtifactStore>) {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::open(
            dir.path().join("captures"),
            dir.path().join("clipshot.db"),
        )
        .unwrap();
        (dir, Arc::new(store))
    }

    fn machine_with(
        kind: MediaKind,
        source: FakeSource,
        store: Arc<ArtifactStore>,
    ) -> CaptureMachine {
        CaptureMachine::new(kind, Box::new(source), store, CaptureStatusHandle::default())
    }

    #[tokio::test]
    async fn test_audio_lifecycle_saves_to_store() {
        let (_dir, store) = setup_store();
        let source = FakeSource::new(b"opus frames");
        let counters = source.counters();
        let mut machine = machine_with(MediaKind::Audio, source, store.clone());

        assert_eq!(machine.start().await.unwrap(), CapturePhase::Recording);
        assert_eq!(machine.stop().await.unwrap(), CapturePhase::Previewing);
        // The device is released before Previewing.
        assert_eq!(counters.closes.load(Ordering::SeqCst), 1);

        assert_eq!(machine.confirm_save().await.unwrap(), CapturePhase::Idle);

        let listed = store.list(MediaKind::Audio, 10).unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].filename.starts_with("recording_"));
        assert!(listed[0].filename.ends_with(".webm"));
    }

    #[tokio::test]
    async fn test_audio_discard_never_reopens_and_never_stores() {
        let (_dir, store) = setup_store();
        let source = FakeSource::new(b"opus frames");
        let counters = source.counters();
        let mut machine = machine_with(MediaKind::Audio, source, store.clone());

        machine.start().await.unwrap();
        machine.stop().await.unwrap();
        assert_eq!(machine.discard().await.unwrap(), CapturePhase::Idle);

        assert_eq!(counters.opens.load(Ordering::SeqCst), 1);
        assert!(store.list(MediaKind::Audio, 10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_photo_discard_reopens_camera() {
        let (_dir, store) = setup_store();
        let source = FakeSource::new(b"png pixels");
        let counters = source.counters();
        let mut machine = machine_with(MediaKind::Photo, source, store.clone());

        assert_eq!(machine.open().await.unwrap(), CapturePhase::Active);
        assert_eq!(machine.snap().await.unwrap(), CapturePhase::Previewing);
        assert_eq!(machine.discard().await.unwrap(), CapturePhase::Active);

        // open → snap-close → discard-reopen
        assert_eq!(counters.opens.load(Ordering::SeqCst), 2);
        assert!(store.list(MediaKind::Photo, 10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_video_lifecycle() {
        let (_dir, store) = setup_store();
        let source = FakeSource::new(b"vp8 frames");
        let mut machine = machine_with(MediaKind::Video, source, store.clone());

        assert_eq!(machine.open().await.unwrap(), CapturePhase::Active);
        assert_eq!(machine.start().await.unwrap(), CapturePhase::Recording);
        assert_eq!(machine.stop().await.unwrap(), CapturePhase::Previewing);
        assert_eq!(machine.discard().await.unwrap(), CapturePhase::Active);

        assert_eq!(machine.start().await.unwrap(), CapturePhase::Recording);
        machine.stop().await.unwrap();
        machine.confirm_save().await.unwrap();

        let listed = store.list(MediaKind::Video, 10).unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].filename.starts_with("video_"));
    }

    #[tokio::test]
    async fn test_acquisition_failure_lands_in_idle() {
        let (_dir, store) = setup_store();
        let mut machine = machine_with(MediaKind::Photo, FakeSource::failing(), store);

        assert!(machine.open().await.is_err());
        assert_eq!(machine.phase(), CapturePhase::Idle);

        let state = machine.status.get().await;
        assert_eq!(state.phase, CapturePhase::Idle);
        assert!(state.last_error.is_some());
    }

    #[tokio::test]
    async fn test_audio_start_failure_lands_in_idle() {
        let (_dir, store) = setup_store();
        let mut machine = machine_with(MediaKind::Audio, FakeSource::failing(), store);

        assert!(machine.start().await.is_err());
        assert_eq!(machine.phase(), CapturePhase::Idle);
    }

    #[tokio::test]
    async fn test_empty_capture_stores_no_partial_artifact() {
        let (_dir, store) = setup_store();
        let mut machine = machine_with(MediaKind::Audio, FakeSource::new(b""), store.clone());

        machine.start().await.unwrap();
        assert!(machine.stop().await.is_err());
        assert_eq!(machine.phase(), CapturePhase::Idle);
        assert!(store.list(MediaKind::Audio, 10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_phase_ops_are_ignored() {
        let (_dir, store) = setup_store();
        let source = FakeSource::new(b"opus frames");
        let counters = source.counters();
        let mut machine = machine_with(MediaKind::Audio, source, store);

        // Audio has no separate open step.
        assert_eq!(machine.open().await.unwrap(), CapturePhase::Idle);
        // Stop before start does nothing.
        assert_eq!(machine.stop().await.unwrap(), CapturePhase::Idle);
        // Save with nothing pending does nothing.
        assert_eq!(machine.confirm_save().await.unwrap(), CapturePhase::Idle);

        machine.start().await.unwrap();
        // Start while recording does nothing.
        assert_eq!(machine.start().await.unwrap(), CapturePhase::Recording);
        assert_eq!(counters.opens.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_save_failure_keeps_pending_blob() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(
            ArtifactStore::open(
                dir.path().join("captures"),
                dir.path().join("clipshot.db"),
            )
            .unwrap(),
        );
        // Block the kind namespace with a plain file so the blob write fails.
        std::fs::write(dir.path().join("captures").join("audio"), b"in the way").unwrap();

        let mut machine = machine_with(MediaKind::Audio, FakeSource::new(b"opus"), store.clone());
        machine.start().await.unwrap();
        machine.stop().await.unwrap();

        assert!(machine.confirm_save().await.is_err());
        assert_eq!(machine.phase(), CapturePhase::Previewing);

        let state = machine.status.get().await;
        assert_eq!(state.phase, CapturePhase::Previewing);
        assert!(state.pending_file_name.is_some());
        assert!(state.last_error.is_some());

        // Unblock the store; the same pending blob saves cleanly.
        std::fs::remove_file(dir.path().join("captures").join("audio")).unwrap();
        assert_eq!(machine.confirm_save().await.unwrap(), CapturePhase::Idle);
        assert_eq!(store.list(MediaKind::Audio, 10).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_store_missing_field_taxonomy() {
        let (_dir, store) = setup_store();
        assert!(matches!(
            store.save(MediaKind::Audio, "", b"data"),
            Err(StoreError::MissingField("fileName"))
        ));
    }
}
