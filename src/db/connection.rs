use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::info;

use crate::error::{storage, RosterResult};

/// Open (creating if needed) the SQLite file at `path` and make sure the
/// `students` table exists. Runs once at start-up before the service is built.
pub fn open_database(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).context("failed to create data directory")?;
        }
    }

    let conn = Connection::open(path)
        .with_context(|| format!("failed to open SQLite database at {}", path.display()))?;
    ensure_schema(&conn).context("failed to create students table")?;
    info!(path = %path.display(), "database ready");
    Ok(conn)
}

/// Create the `students` table if it is missing. The primary key on `id` is
/// what ultimately guards uniqueness; the service's lookups only produce the
/// friendlier error first.
pub fn ensure_schema(conn: &Connection) -> RosterResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS students (
            id TEXT PRIMARY KEY NOT NULL,
            firstName TEXT NOT NULL,
            lastName TEXT NOT NULL,
            email TEXT NOT NULL,
            mark TEXT NOT NULL
        )",
        [],
    )
    .map_err(storage("creating the students table"))?;
    Ok(())
}
