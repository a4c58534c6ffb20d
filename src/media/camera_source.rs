//! Camera capture via ffmpeg over a V4L2 device node.
//!
//! Clip recording runs ffmpeg as a child process writing WebM to a temp
//! path; the `q` stdin command stops it gracefully so the container gets
//! finalized. Stills are single-frame invocations producing PNG.

use std::io::Write;
use std::process::{Child, Command, Stdio};

use tempfile::TempDir;
use tracing::{info, warn};

use super::encode;
use super::media_source::{MediaSource, SourceError};

struct Recording {
    child: Child,
    workdir: TempDir,
}

pub struct CameraSource {
    device: String,
    width: u32,
    height: u32,
    open: bool,
    recording: Option<Recording>,
}

impl CameraSource {
    pub fn new(device: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            device: device.into(),
            width,
            height,
            open: false,
            recording: None,
        }
    }

    fn frame_size(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    fn acquisition_error(&self, err: std::io::Error) -> SourceError {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => SourceError::PermissionDenied(format!(
                "cannot access camera device {}",
                self.device
            )),
            _ => SourceError::DeviceUnavailable(format!(
                "camera device {} unavailable: {}",
                self.device, err
            )),
        }
    }
}

impl MediaSource for CameraSource {
    fn open(&mut self) -> Result<(), SourceError> {
        if self.open {
            return Ok(());
        }

        // Probe the device node; this is where permission problems surface.
        std::fs::File::open(&self.device).map_err(|e| self.acquisition_error(e))?;

        if let Err(e) = encode::ffmpeg_path() {
            return Err(SourceError::DeviceUnavailable(e.to_string()));
        }

        self.open = true;
        info!("Camera acquired: {}", self.device);
        Ok(())
    }

    fn start_capture(&mut self) -> Result<(), SourceError> {
        if !self.open {
            return Err(SourceError::NotOpen);
        }
        if self.recording.is_some() {
            return Err(SourceError::CaptureFailed(
                "recording already in progress".to_string(),
            ));
        }

        let ffmpeg =
            encode::ffmpeg_path().map_err(|e| SourceError::CaptureFailed(e.to_string()))?;
        let workdir = tempfile::tempdir()
            .map_err(|e| SourceError::CaptureFailed(format!("temp dir: {}", e)))?;
        let output = workdir.path().join("clip.webm");

        let child = Command::new(ffmpeg)
            .args(["-f", "v4l2"])
            .args(["-framerate", "30"])
            .args(["-video_size", &self.frame_size()])
            .args(["-i", &self.device])
            .args(["-codec:v", "libvpx"])
            .args(["-y"])
            .arg(&output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SourceError::CaptureFailed(format!("failed to spawn ffmpeg: {}", e)))?;

        self.recording = Some(Recording { child, workdir });
        info!("Camera recording started on {}", self.device);
        Ok(())
    }

    fn finish_capture(&mut self) -> Result<Vec<u8>, SourceError> {
        if !self.open {
            return Err(SourceError::NotOpen);
        }
        let mut recording = self.recording.take().ok_or_else(|| {
            SourceError::CaptureFailed("no recording in progress".to_string())
        })?;

        // Ask ffmpeg to stop and finalize the container.
        if let Some(stdin) = recording.child.stdin.take() {
            let mut stdin = stdin;
            let _ = stdin.write_all(b"q\n");
        }

        let output_path = recording.workdir.path().join("clip.webm");
        let result = recording
            .child
            .wait_with_output()
            .map_err(|e| SourceError::CaptureFailed(format!("ffmpeg wait failed: {}", e)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(SourceError::CaptureFailed(format!(
                "ffmpeg recording failed: {}",
                stderr
            )));
        }

        let bytes = std::fs::read(&output_path).map_err(|e| {
            SourceError::CaptureFailed(format!("ffmpeg produced no output: {}", e))
        })?;
        if bytes.is_empty() {
            return Err(SourceError::CaptureFailed(
                "ffmpeg produced an empty clip".to_string(),
            ));
        }

        info!("Camera recording finalized, {} bytes", bytes.len());
        Ok(bytes)
    }

    fn snapshot(&mut self) -> Result<Vec<u8>, SourceError> {
        if !self.open {
            return Err(SourceError::NotOpen);
        }

        let ffmpeg =
            encode::ffmpeg_path().map_err(|e| SourceError::CaptureFailed(e.to_string()))?;
        let workdir = tempfile::tempdir()
            .map_err(|e| SourceError::CaptureFailed(format!("temp dir: {}", e)))?;
        let output = workdir.path().join("still.png");

        let result = Command::new(ffmpeg)
            .args(["-f", "v4l2"])
            .args(["-video_size", &self.frame_size()])
            .args(["-i", &self.device])
            .args(["-frames:v", "1"])
            .args(["-f", "image2"])
            .args(["-y"])
            .arg(&output)
            .output()
            .map_err(|e| SourceError::CaptureFailed(format!("failed to run ffmpeg: {}", e)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(SourceError::CaptureFailed(format!(
                "ffmpeg snapshot failed: {}",
                stderr
            )));
        }

        let bytes = std::fs::read(&output).map_err(|e| {
            SourceError::CaptureFailed(format!("ffmpeg produced no snapshot: {}", e))
        })?;
        if bytes.is_empty() {
            return Err(SourceError::CaptureFailed(
                "ffmpeg produced an empty snapshot".to_string(),
            ));
        }

        info!("Camera snapshot captured, {} bytes", bytes.len());
        Ok(bytes)
    }

    fn close(&mut self) {
        if let Some(mut recording) = self.recording.take() {
            warn!("Closing camera with a recording in progress, discarding clip");
            if let Some(stdin) = recording.child.stdin.take() {
                let mut stdin = stdin;
                let _ = stdin.write_all(b"q\n");
            }
            let _ = recording.child.wait();
        }
        if self.open {
            self.open = false;
            info!("Camera released: {}", self.device);
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.close();
    }
}
