//! Token access used by the authenticated transport.

use std::fmt::Debug;

/// Source and sink of the bearer token.
///
/// The session layer implements this so the client can read the current
/// token, store a refreshed one, and end the session when a refresh is
/// rejected.
pub trait TokenStore: Send + Sync + Debug {
    /// Returns the current bearer token, if logged in.
    fn token(&self) -> Option<String>;

    /// Replaces the bearer token after a successful refresh.
    fn store_token(&self, token: &str);

    /// Ends the session after the backend rejected a refresh.
    fn expire(&self);
}
