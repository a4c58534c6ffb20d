pub mod camera_source;
pub mod encode;
pub mod media_source;
pub mod mic_source;

pub use camera_source::CameraSource;
pub use media_source::{MediaSource, SourceError};
pub use mic_source::MicSource;

use serde::{Deserialize, Serialize};

/// The medium discriminator for a capture session or stored artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Photo,
    Video,
}

impl MediaKind {
    pub const ALL: [MediaKind; 3] = [MediaKind::Audio, MediaKind::Photo, MediaKind::Video];

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
        }
    }

    /// Filename prefix used by the artifact naming convention.
    pub fn file_prefix(&self) -> &'static str {
        match self {
            MediaKind::Audio => "recording",
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
        }
    }

    /// Container extension for captured blobs of this kind.
    pub fn extension(&self) -> &'static str {
        match self {
            MediaKind::Audio | MediaKind::Video => "webm",
            MediaKind::Photo => "png",
        }
    }
}

impl std::str::FromStr for MediaKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio" => Ok(MediaKind::Audio),
            "photo" => Ok(MediaKind::Photo),
            "video" => Ok(MediaKind::Video),
            _ => anyhow::bail!("Invalid media kind: {}", s),
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
