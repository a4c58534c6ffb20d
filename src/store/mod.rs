//! Artifact persistence: blob files on disk plus metadata rows in SQLite.
//!
//! The blob write and the metadata insert are two separate steps, not a
//! transaction. A metadata failure after a successful blob write leaves an
//! orphaned blob on disk; the error is surfaced and the artifact is not
//! listed.

pub mod naming;

pub use naming::artifact_file_name;

use std::path::PathBuf;

use rusqlite::Connection;
use thiserror::Error;
use tracing::{info, warn};

use crate::db::{self, Artifact};
use crate::media::MediaKind;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("missing {0}")]
    MissingField(&'static str),
    #[error("invalid file name: {0}")]
    InvalidFileName(String),
    #[error("artifact not found: {0}")]
    NotFound(String),
    #[error("failed to write artifact blob: {0}")]
    Io(#[from] std::io::Error),
    #[error("store unavailable: {0}")]
    Unavailable(#[from] anyhow::Error),
}

pub struct ArtifactStore {
    captures_dir: PathBuf,
    db_path: PathBuf,
}

impl ArtifactStore {
    /// Open a store rooted at `captures_dir` with metadata at `db_path`,
    /// creating directories and applying migrations.
    pub fn open(captures_dir: impl Into<PathBuf>, db_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let captures_dir = captures_dir.into();
        let db_path = db_path.into();

        std::fs::create_dir_all(&captures_dir)?;
        db::open_db(&db_path)?;

        info!("Artifact store opened at {:?}", captures_dir);
        Ok(Self {
            captures_dir,
            db_path,
        })
    }

    fn conn(&self) -> Result<Connection, StoreError> {
        Ok(db::open_db(&self.db_path)?)
    }

    fn kind_dir(&self, kind: MediaKind) -> PathBuf {
        self.captures_dir.join(kind.as_str())
    }

    /// Durably write a named blob under the kind's namespace, then record
    /// its metadata. Rejects an empty filename or blob before any mutation.
    pub fn save(
        &self,
        kind: MediaKind,
        file_name: &str,
        blob: &[u8],
    ) -> Result<Artifact, StoreError> {
        if file_name.is_empty() {
            return Err(StoreError::MissingField("fileName"));
        }
        if blob.is_empty() {
            return Err(StoreError::MissingField("blob"));
        }
        validate_file_name(file_name)?;

        let dir = self.kind_dir(kind);
        std::fs::create_dir_all(&dir)?;

        let blob_path = dir.join(file_name);
        std::fs::write(&blob_path, blob)?;

        let conn = self.conn()?;
        let id = db::insert_artifact(
            &conn,
            kind,
            file_name,
            &blob_path.to_string_lossy(),
            blob.len() as i64,
        )
        .map_err(|e| {
            warn!(
                "Metadata write failed after blob write, orphaned blob at {:?}",
                blob_path
            );
            StoreError::Unavailable(e)
        })?;

        info!(
            "Saved {} artifact {} ({} bytes)",
            kind.as_str(),
            file_name,
            blob.len()
        );

        match db::get_artifact(&conn, kind, file_name)? {
            Some(artifact) => Ok(artifact),
            None => Ok(Artifact {
                id: Some(id),
                kind,
                filename: file_name.to_string(),
                path: blob_path.to_string_lossy().to_string(),
                size_bytes: blob.len() as i64,
                created_at: None,
            }),
        }
    }

    /// Enumerate stored artifacts of one kind, newest first. An empty
    /// store yields an empty vec, never an error.
    pub fn list(&self, kind: MediaKind, limit: usize) -> Result<Vec<Artifact>, StoreError> {
        let conn = self.conn()?;
        Ok(db::list_artifacts(&conn, kind, limit)?)
    }

    pub fn count(&self, kind: MediaKind) -> Result<i64, StoreError> {
        let conn = self.conn()?;
        Ok(db::count_artifacts(&conn, kind)?)
    }

    /// Read a stored blob back for download.
    pub fn read_blob(&self, kind: MediaKind, file_name: &str) -> Result<Vec<u8>, StoreError> {
        validate_file_name(file_name)?;

        let conn = self.conn()?;
        let artifact = db::get_artifact(&conn, kind, file_name)?
            .ok_or_else(|| StoreError::NotFound(file_name.to_string()))?;

        match std::fs::read(&artifact.path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(file_name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn validate_file_name(file_name: &str) -> Result<(), StoreError> {
    let looks_like_path = file_name.contains('/') || file_name.contains('\\');
    if looks_like_path || file_name == "." || file_name == ".." {
        return Err(StoreError::InvalidFileName(file_name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_store() -> (TempDir, ArtifactStore) {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::open(
            dir.path().join("captures"),
            dir.path().join("clipshot.db"),
        )
        .unwrap();
        (dir, store)
    }

    #[test]
    fn test_save_then_list_head() {
        let (_dir, store) = setup_store();

        store
            .save(MediaKind::Audio, "recording_old.webm", b"older")
            .unwrap();
        let saved = store
            .save(MediaKind::Audio, "recording_new.webm", b"newer")
            .unwrap();
        assert_eq!(saved.size_bytes, 5);

        let listed = store.list(MediaKind::Audio, 10).unwrap();
        assert_eq!(listed[0].filename, "recording_new.webm");
        assert_eq!(listed[1].filename, "recording_old.webm");
    }

    #[test]
    fn test_save_writes_blob_under_kind_namespace() {
        let (dir, store) = setup_store();

        store
            .save(MediaKind::Photo, "photo_x.png", b"pixels")
            .unwrap();

        let blob_path = dir.path().join("captures").join("photo").join("photo_x.png");
        assert_eq!(std::fs::read(blob_path).unwrap(), b"pixels");
    }

    #[test]
    fn test_missing_fields_do_not_mutate() {
        let (_dir, store) = setup_store();

        assert!(matches!(
            store.save(MediaKind::Audio, "", b"data"),
            Err(StoreError::MissingField("fileName"))
        ));
        assert!(matches!(
            store.save(MediaKind::Audio, "recording_x.webm", b""),
            Err(StoreError::MissingField("blob"))
        ));

        assert!(store.list(MediaKind::Audio, 10).unwrap().is_empty());
    }

    #[test]
    fn test_list_empty_store_is_ok() {
        let (_dir, store) = setup_store();
        for kind in MediaKind::ALL {
            assert!(store.list(kind, 10).unwrap().is_empty());
        }
    }

    #[test]
    fn test_read_blob_round_trip() {
        let (_dir, store) = setup_store();

        store
            .save(MediaKind::Video, "video_x.webm", b"frames")
            .unwrap();

        assert_eq!(
            store.read_blob(MediaKind::Video, "video_x.webm").unwrap(),
            b"frames"
        );
        assert!(matches!(
            store.read_blob(MediaKind::Video, "video_y.webm"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_path_traversal_is_rejected() {
        let (_dir, store) = setup_store();

        assert!(matches!(
            store.save(MediaKind::Photo, "../escape.png", b"data"),
            Err(StoreError::InvalidFileName(_))
        ));
        assert!(matches!(
            store.read_blob(MediaKind::Photo, "a/b.png"),
            Err(StoreError::InvalidFileName(_))
        ));
    }

    #[test]
    fn test_colliding_names_are_not_deduplicated() {
        let (_dir, store) = setup_store();

        store
            .save(MediaKind::Photo, "photo_same.png", b"first")
            .unwrap();
        store
            .save(MediaKind::Photo, "photo_same.png", b"second")
            .unwrap();

        // Two metadata rows, one (overwritten) blob. Matches source behavior.
        let listed = store.list(MediaKind::Photo, 10).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(
            store.read_blob(MediaKind::Photo, "photo_same.png").unwrap(),
            b"second"
        );
    }
}
