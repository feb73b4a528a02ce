//! Backend API client module.
//!
//! Talks to the REST service that owns accounts, favorites and the
//! watchlist. Every authenticated request carries the bearer token from a
//! [`TokenStore`] and is replayed once after a successful token refresh.

mod api;
mod client;
mod error;
mod token;
mod types;

#[allow(clippy::module_name_repetitions)]
pub use api::{BackendApi, LocalBackendApi};
#[allow(clippy::module_name_repetitions)]
pub use client::{BackendClient, BackendClientBuilder};
pub use error::{ApiError, AuthFailure, ErrorKind};
pub use token::TokenStore;
pub use types::{
    Credentials, ListItem, ListKind, LoginResponse, PictureUpload, ProfilePatch, Registration,
    User,
};
