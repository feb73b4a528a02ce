//! Session and list synchronization for cinelist.
//!
//! Owns the login session and the favorites/watchlist collections, keeps
//! them in durable storage, and replicates list changes to the backend
//! optimistically.

mod auth;
mod bootstrap;
mod context;
mod session;
mod synced;

/// Favorites and watchlist reconciliation.
pub mod list;

#[cfg(test)]
mod test_support;

pub use auth::AuthService;
pub use bootstrap::bootstrap;
pub use context::SyncContext;
pub use list::{ListPhase, ListReconciler, ListSnapshot, ListState};
pub use session::{Session, SessionStore};
pub use synced::{SyncWarning, Synced};
