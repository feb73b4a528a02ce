//! Favorites and watchlist reconciliation.

mod reconciler;
mod state;

pub use reconciler::ListReconciler;
pub use state::{ListPhase, ListSnapshot, ListState};
