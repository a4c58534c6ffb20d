//! Device stream abstraction for capturing media from different inputs.

use thiserror::Error;

/// Errors surfaced by a media source.
///
/// `PermissionDenied` and `DeviceUnavailable` are acquisition failures: the
/// caller stays in its pre-capture state and shows the message. Everything
/// else is a mid-capture failure after which the device must be released.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("device access denied: {0}")]
    PermissionDenied(String),
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("no open stream")]
    NotOpen,
    #[error("operation not supported by this source")]
    Unsupported,
    #[error("capture failed: {0}")]
    CaptureFailed(String),
}

/// Trait for capture device sources (microphone, camera, etc.).
///
/// A source owns at most one device stream at a time. `close` is idempotent
/// and must be called on every exit path from an active session.
pub trait MediaSource: Send {
    /// Acquire the device stream.
    fn open(&mut self) -> Result<(), SourceError>;

    /// Begin accumulating captured data. Requires an open stream.
    fn start_capture(&mut self) -> Result<(), SourceError>;

    /// Stop accumulating and return the finalized, container-encoded blob.
    fn finish_capture(&mut self) -> Result<Vec<u8>, SourceError>;

    /// Grab one still frame from the live stream as an encoded image.
    ///
    /// Only meaningful for camera sources; others return `Unsupported`.
    fn snapshot(&mut self) -> Result<Vec<u8>, SourceError>;

    /// Stop the stream and release the device. Safe to call repeatedly.
    fn close(&mut self);

    /// Whether a stream is currently held.
    fn is_open(&self) -> bool;
}
