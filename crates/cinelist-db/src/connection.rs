//! Database connection management.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::Connection;

use super::migrations::run_migrations;

/// Database file name inside the data directory.
const DB_FILE_NAME: &str = "cinelist.db";

/// Opens (or creates) the storage database and runs migrations.
///
/// - If `dir` is `Some`, uses `{dir}/cinelist.db`.
/// - Otherwise uses `$XDG_DATA_HOME/cinelist/cinelist.db`, where an unset
///   `XDG_DATA_HOME` means `~/.local/share`.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or migrations fail.
pub fn open_db(dir: Option<&Path>) -> Result<Connection> {
    let db_path = resolve_db_path(dir)?;

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open database {}", db_path.display()))?;

    run_migrations(&conn).context("database migration failed")?;
    tracing::debug!(path = %db_path.display(), "storage database opened");

    Ok(conn)
}

/// Resolves the database file path.
///
/// # Errors
///
/// Returns an error if `dir` is `None` and `HOME` is not set.
pub fn resolve_db_path(dir: Option<&Path>) -> Result<PathBuf> {
    if let Some(d) = dir {
        return Ok(d.join(DB_FILE_NAME));
    }

    let base = match std::env::var_os("XDG_DATA_HOME").filter(|v| !v.is_empty()) {
        Some(xdg) => PathBuf::from(xdg),
        None => {
            let home = std::env::var("HOME").context("HOME environment variable is not set")?;
            PathBuf::from(home).join(".local").join("share")
        }
    };
    Ok(base.join("cinelist").join(DB_FILE_NAME))
}
