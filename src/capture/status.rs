//! Capture status types and shared state handle.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Phase of a capture session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapturePhase {
    Idle,
    Active,
    Recording,
    Previewing,
}

impl CapturePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Active => "active",
            Self::Recording => "recording",
            Self::Previewing => "previewing",
        }
    }
}

/// Current capture state, readable by API handlers.
#[derive(Debug, Clone)]
pub struct CaptureState {
    pub phase: CapturePhase,
    pub session_id: Option<Uuid>,
    pub pending_file_name: Option<String>,
    pub pending_size_bytes: Option<usize>,
    pub last_error: Option<String>,
}

impl Default for CaptureState {
    fn default() -> Self {
        Self {
            phase: CapturePhase::Idle,
            session_id: None,
            pending_file_name: None,
            pending_size_bytes: None,
            last_error: None,
        }
    }
}

/// Thread-safe handle for sharing capture state between a machine and API
/// handlers.
#[derive(Clone, Default)]
pub struct CaptureStatusHandle {
    inner: Arc<Mutex<CaptureState>>,
}

impl CaptureStatusHandle {
    pub async fn get(&self) -> CaptureState {
        self.inner.lock().await.clone()
    }

    /// A fresh device acquisition: new session, no pending blob, no error.
    pub async fn begin_session(&self, session_id: Uuid, phase: CapturePhase) {
        let mut state = self.inner.lock().await;
        state.phase = phase;
        state.session_id = Some(session_id);
        state.pending_file_name = None;
        state.pending_size_bytes = None;
        state.last_error = None;
    }

    pub async fn set_phase(&self, phase: CapturePhase) {
        let mut state = self.inner.lock().await;
        state.phase = phase;
    }

    /// A finalized blob is being held for save/discard.
    pub async fn set_preview(&self, file_name: String, size_bytes: usize) {
        let mut state = self.inner.lock().await;
        state.phase = CapturePhase::Previewing;
        state.pending_file_name = Some(file_name);
        state.pending_size_bytes = Some(size_bytes);
        state.last_error = None;
    }

    pub async fn set_error(&self, phase: CapturePhase, error: String) {
        let mut state = self.inner.lock().await;
        state.phase = phase;
        state.last_error = Some(error);
        if phase != CapturePhase::Previewing {
            state.pending_file_name = None;
            state.pending_size_bytes = None;
        }
    }

    pub async fn reset(&self) {
        let mut state = self.inner.lock().await;
        *state = CaptureState::default();
    }
}
