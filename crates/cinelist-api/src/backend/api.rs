//! `BackendApi` trait definition.
#![allow(clippy::future_not_send)]

use super::error::ApiError;
use super::types::{
    Credentials, ListItem, ListKind, LoginResponse, PictureUpload, ProfilePatch, Registration,
    User,
};

/// Backend API trait.
///
/// Abstracts backend operations for mock substitution in tests.
/// Uses `trait_variant::make` to generate a `Send`-bound async trait.
#[allow(clippy::module_name_repetitions)]
#[trait_variant::make(BackendApi: Send)]
pub trait LocalBackendApi {
    /// Exchanges credentials for a bearer token and user profile.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::AuthFailed` for rejected credentials or an unknown
    /// user, `ApiError::Transient` for network failures.
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError>;

    /// Creates a new account. Does not log in.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the registration.
    async fn register(&self, registration: &Registration) -> Result<(), ApiError>;

    /// Exchanges the current token for a fresh one.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::SessionExpired` when the backend rejects the refresh.
    async fn refresh_token(&self) -> Result<String, ApiError>;

    /// Updates profile fields and returns the stored profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn update_profile(&self, patch: &ProfilePatch) -> Result<User, ApiError>;

    /// Uploads a new profile picture and returns the updated profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn upload_profile_picture(&self, upload: &PictureUpload) -> Result<User, ApiError>;

    /// Fetches the remote copy of a list.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn list_items(&self, kind: ListKind) -> Result<Vec<ListItem>, ApiError>;

    /// Adds an item and returns the remote list after the change.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn add_item(&self, kind: ListKind, item: &ListItem) -> Result<Vec<ListItem>, ApiError>;

    /// Removes an item by movie ID and returns the remote list after the change.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails. A missing item is reported as
    /// `ApiError::Rejected` with status 404.
    async fn remove_item(&self, kind: ListKind, id: u64) -> Result<Vec<ListItem>, ApiError>;
}
