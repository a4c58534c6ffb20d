//! FFmpeg-backed container encoding for captured media.
//!
//! Raw device captures (PCM samples, camera frames) are finalized into the
//! containers the artifact store expects (WebM/Opus for sound, WebM/VP9 for
//! clips, PNG for stills) by shelling out to ffmpeg.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::process::Command;

/// Locate the ffmpeg binary on PATH.
pub fn ffmpeg_path() -> Result<PathBuf> {
    which::which("ffmpeg").map_err(|_| {
        anyhow::anyhow!(
            "FFmpeg is required to finalize captures but was not found.\n\
             Install FFmpeg:\n\
             - macOS: brew install ffmpeg\n\
             - Ubuntu/Debian: sudo apt install ffmpeg\n\
             - Arch: sudo pacman -S ffmpeg"
        )
    })
}

pub fn ffmpeg_available() -> bool {
    ffmpeg_path().is_ok()
}

/// Encode an in-memory WAV capture to WebM/Opus.
///
/// 48kbps variable bitrate, plenty for voice recordings.
pub fn wav_to_webm(wav: &[u8]) -> Result<Vec<u8>> {
    let ffmpeg = ffmpeg_path()?;

    let mut input = tempfile::Builder::new()
        .prefix("clipshot_")
        .suffix(".wav")
        .tempfile()
        .context("Failed to create temp WAV file")?;
    std::io::Write::write_all(&mut input, wav).context("Failed to write temp WAV file")?;

    let output_dir = tempfile::tempdir().context("Failed to create temp output dir")?;
    let output = output_dir.path().join("capture.webm");

    let result = Command::new(&ffmpeg)
        .args(["-i"])
        .arg(input.path())
        .args(["-vn"])
        .args(["-codec:a", "libopus"])
        .args(["-b:a", "48k"])
        .args(["-vbr", "on"])
        .args(["-y"])
        .arg(&output)
        .output()
        .context("Failed to run FFmpeg")?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        bail!("FFmpeg encoding failed: {}", stderr);
    }

    let bytes = std::fs::read(&output).context("FFmpeg did not produce output file")?;
    if bytes.is_empty() {
        bail!("FFmpeg produced an empty output file");
    }

    Ok(bytes)
}
