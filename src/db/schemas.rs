use serde::Serialize;

use crate::media::MediaKind;

/// A persisted capture plus its metadata, as stored in the `artifacts` table.
#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    pub id: Option<i64>,
    pub kind: MediaKind,
    pub filename: String,
    pub path: String,
    pub size_bytes: i64,
    pub created_at: Option<String>,
}

impl Artifact {
    /// Display string for listings: filename for audio/photo, filename
    /// plus storage path for video consumers that want the richer record.
    pub fn display_name(&self) -> &str {
        &self.filename
    }
}
