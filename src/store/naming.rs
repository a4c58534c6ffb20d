//! Artifact filename convention.

use chrono::{DateTime, Utc};

use crate::media::MediaKind;

/// `<prefix>_<ISO-8601 UTC timestamp with ':' replaced by '-'>.<ext>`.
///
/// Uniqueness relies on millisecond granularity only; two captures landing
/// on the same millisecond collide, and the store does not deduplicate.
pub fn artifact_file_name(kind: MediaKind, at: DateTime<Utc>) -> String {
    let timestamp = at.format("%Y-%m-%dT%H-%M-%S%.3fZ");
    format!("{}_{}.{}", kind.file_prefix(), timestamp, kind.extension())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_audio_name_matches_convention() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            artifact_file_name(MediaKind::Audio, at),
            "recording_2024-01-01T00-00-00.000Z.webm"
        );
    }

    #[test]
    fn test_names_never_contain_colons() {
        let at = Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 58).unwrap();
        for kind in MediaKind::ALL {
            let name = artifact_file_name(kind, at);
            assert!(!name.contains(':'), "{name}");
            assert!(name.starts_with(kind.file_prefix()));
            assert!(name.ends_with(kind.extension()));
        }
    }

    #[test]
    fn test_photo_and_video_extensions() {
        let at = Utc.with_ymd_and_hms(2024, 6, 15, 12, 30, 45).unwrap();
        assert!(artifact_file_name(MediaKind::Photo, at).ends_with(".png"));
        assert!(artifact_file_name(MediaKind::Video, at).ends_with(".webm"));
        assert!(artifact_file_name(MediaKind::Video, at).starts_with("video_"));
    }
}
