//! Durable client storage for cinelist.
//!
//! Persists the session and the favorites/watchlist collections as
//! JSON strings under fixed keys. The on-disk backend is a bundled
//! `SQLite` database; an in-memory backend is provided for tests and
//! ephemeral runs.

mod connection;
mod json;
mod memory;
mod migrations;
mod sqlite;

/// Key-value storage abstraction.
pub mod store;

pub use connection::{open_db, resolve_db_path};
pub use json::{read_json, write_json};
#[allow(clippy::module_name_repetitions)]
pub use memory::MemoryStore;
#[allow(clippy::module_name_repetitions)]
pub use sqlite::SqliteStore;
#[allow(clippy::module_name_repetitions)]
pub use store::KeyValueStore;
