//! `SQLite`-backed `KeyValueStore`.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};

use super::connection::open_db;
use super::store::KeyValueStore;

/// Key-value store persisted in the `kv_store` table.
#[derive(Debug)]
pub struct SqliteStore {
    /// Connection guarded for shared use.
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens the store in `dir` (or the default data directory).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(dir: Option<&Path>) -> Result<Self> {
        let conn = open_db(dir)?;
        Ok(Self::from_connection(conn))
    }

    /// Wraps an already migrated connection.
    #[must_use]
    pub const fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock();
        conn.query_row(
            "SELECT value FROM kv_store WHERE key = ?1",
            rusqlite::params![key],
            |row| row.get(0),
        )
        .optional()
        .with_context(|| format!("failed to read key {key}"))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
            rusqlite::params![key, value],
        )
        .with_context(|| format!("failed to write key {key}"))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let conn = self.lock();
        conn.execute("DELETE FROM kv_store WHERE key = ?1", rusqlite::params![key])
            .with_context(|| format!("failed to remove key {key}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn open_temp() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(Some(dir.path())).unwrap();
        (dir, store)
    }

    #[test]
    fn test_get_missing_key_returns_none() {
        // Arrange
        let (_dir, store) = open_temp();

        // Act
        let value = store.get("session").unwrap();

        // Assert
        assert!(value.is_none());
    }

    #[test]
    fn test_set_overwrites_whole_value() {
        // Arrange
        let (_dir, store) = open_temp();
        store.set("favorites", "[1,2,3]").unwrap();

        // Act
        store.set("favorites", "[]").unwrap();

        // Assert
        assert_eq!(store.get("favorites").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_remove_deletes_key_and_tolerates_missing() {
        // Arrange
        let (_dir, store) = open_temp();
        store.set("session", "{}").unwrap();

        // Act
        store.remove("session").unwrap();
        store.remove("session").unwrap();

        // Assert
        assert!(store.get("session").unwrap().is_none());
    }

    #[test]
    fn test_values_survive_reopen() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        {
            let store = SqliteStore::open(Some(dir.path())).unwrap();
            store.set("watchlist", r#"[{"id":7,"title":"X"}]"#).unwrap();
        }

        // Act
        let reopened = SqliteStore::open(Some(dir.path())).unwrap();

        // Assert
        assert_eq!(
            reopened.get("watchlist").unwrap().as_deref(),
            Some(r#"[{"id":7,"title":"X"}]"#)
        );
    }
}
