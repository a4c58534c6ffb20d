use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

/// Open the metadata database at an explicit path, creating it (and its
/// parent directory) if needed, and apply migrations.
pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }

    let conn = Connection::open(path).context("Failed to open database connection")?;

    migrate(&conn)?;

    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS artifacts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            kind TEXT NOT NULL,
            filename TEXT NOT NULL,
            path TEXT NOT NULL,
            size_bytes INTEGER NOT NULL,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )
    .context("Failed to create artifacts table")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_artifacts_kind_created_at \
         ON artifacts(kind, created_at DESC)",
        [],
    )
    .context("Failed to create index on artifacts")?;

    Ok(())
}
