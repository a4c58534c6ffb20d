use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use super::schemas::Artifact;
use crate::media::MediaKind;

fn row_to_artifact(row: &rusqlite::Row<'_>) -> rusqlite::Result<Artifact> {
    let id: i64 = row.get(0)?;
    let kind: String = row.get(1)?;
    let filename: String = row.get(2)?;
    let path: String = row.get(3)?;
    let size_bytes: i64 = row.get(4)?;
    let created_at: String = row.get(5)?;

    let kind = kind
        .parse::<MediaKind>()
        .map_err(|_| rusqlite::Error::InvalidQuery)?;

    Ok(Artifact {
        id: Some(id),
        kind,
        filename,
        path,
        size_bytes,
        created_at: Some(created_at),
    })
}

pub fn insert_artifact(
    conn: &Connection,
    kind: MediaKind,
    filename: &str,
    path: &str,
    size_bytes: i64,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO artifacts (kind, filename, path, size_bytes) VALUES (?1, ?2, ?3, ?4)",
        params![kind.as_str(), filename, path, size_bytes],
    )
    .context("Failed to insert artifact")?;

    Ok(conn.last_insert_rowid())
}

/// List artifacts of one kind, newest first. Same-second inserts keep
/// insertion order via the id tiebreaker.
pub fn list_artifacts(conn: &Connection, kind: MediaKind, limit: usize) -> Result<Vec<Artifact>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, kind, filename, path, size_bytes, created_at FROM artifacts \
             WHERE kind = ?1 ORDER BY created_at DESC, id DESC LIMIT ?2",
        )
        .context("Failed to prepare artifacts list query")?;

    let rows = stmt
        .query_map(params![kind.as_str(), limit as i64], row_to_artifact)
        .context("Failed to list artifacts")?;

    let mut artifacts = Vec::new();
    for row in rows {
        artifacts.push(row?);
    }

    Ok(artifacts)
}

pub fn get_artifact(
    conn: &Connection,
    kind: MediaKind,
    filename: &str,
) -> Result<Option<Artifact>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, kind, filename, path, size_bytes, created_at FROM artifacts \
             WHERE kind = ?1 AND filename = ?2 ORDER BY id DESC LIMIT 1",
        )
        .context("Failed to prepare artifact query")?;

    let mut rows = stmt
        .query_map(params![kind.as_str(), filename], row_to_artifact)
        .context("Failed to query artifact")?;

    match rows.next() {
        Some(Ok(record)) => Ok(Some(record)),
        Some(Err(e)) => Err(e.into()),
        None => Ok(None),
    }
}

pub fn count_artifacts(conn: &Connection, kind: MediaKind) -> Result<i64> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM artifacts WHERE kind = ?1",
            params![kind.as_str()],
            |row| row.get(0),
        )
        .context("Failed to count artifacts")?;

    Ok(count)
}
