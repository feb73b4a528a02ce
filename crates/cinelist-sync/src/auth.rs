//! Account operations on top of the session store.

use std::sync::Arc;

use cinelist_api::backend::{
    ApiError, BackendApi, Credentials, PictureUpload, ProfilePatch, Registration,
};
use tracing::instrument;

use crate::session::{Session, SessionStore};

/// Login, registration, profile and token operations.
///
/// Failures are returned to the caller as typed `ApiError`s.
#[derive(Debug)]
pub struct AuthService<B> {
    session: Arc<SessionStore>,
    backend: Arc<B>,
}

impl<B: BackendApi + Sync> AuthService<B> {
    /// Creates the service.
    pub const fn new(session: Arc<SessionStore>, backend: Arc<B>) -> Self {
        Self { session, backend }
    }

    /// Logs in and stores the session.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::AuthFailed` for bad credentials or an unknown user,
    /// `ApiError::Transient` for network failures, and `ApiError::Decode`
    /// when the response carries no user.
    #[instrument(skip_all)]
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, ApiError> {
        let response = self.backend.login(credentials).await?;
        let token = response
            .token
            .map(|t| String::from(t.trim()))
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Rejected {
                status: 200,
                message: String::from("login response did not include a token"),
            })?;
        let user = response.user.ok_or_else(|| {
            ApiError::Decode(String::from("login response did not include a user"))
        })?;

        let session = self.session.establish(token, user);
        tracing::info!("logged in");
        Ok(session)
    }

    /// Validates and submits a registration. Does not log in.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` when validation fails, or the
    /// backend's error.
    #[instrument(skip_all)]
    pub async fn register(&self, registration: &Registration) -> Result<(), ApiError> {
        registration.validate()?;
        self.backend.register(registration).await?;
        tracing::info!("registered");
        Ok(())
    }

    /// Loads the persisted session.
    pub fn restore(&self) -> Session {
        self.session.restore()
    }

    /// Ends the session and clears both lists.
    pub fn logout(&self) {
        self.session.logout();
        tracing::info!("logged out");
    }

    /// Applies `patch` locally, then on the backend.
    ///
    /// On success the backend's copy of the user replaces the local one. On
    /// failure the local merge stays in place and the error is returned.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotAuthenticated` when logged out,
    /// `ApiError::InvalidInput` for an empty patch, or the backend's error.
    #[instrument(skip_all)]
    pub async fn update_profile(&self, patch: &ProfilePatch) -> Result<Session, ApiError> {
        if patch.is_empty() {
            return Err(ApiError::InvalidInput(String::from("Nothing to update")));
        }
        let (_, epoch) = self.session.merge_user(patch)?;
        let user = self.backend.update_profile(patch).await?;
        self.session
            .replace_user_if_current(epoch, user)
            .ok_or(ApiError::NotAuthenticated)
    }

    /// Uploads a profile picture and stores the returned URL on the user.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotAuthenticated` when logged out, or the
    /// backend's error.
    #[instrument(skip_all)]
    pub async fn upload_profile_picture(
        &self,
        upload: &PictureUpload,
    ) -> Result<Session, ApiError> {
        if !self.session.is_authenticated() {
            return Err(ApiError::NotAuthenticated);
        }
        let epoch = self.session.epoch();
        let user = self.backend.upload_profile_picture(upload).await?;
        let patch = ProfilePatch {
            profile_picture: user.profile_picture,
            ..ProfilePatch::default()
        };
        self.session
            .merge_user_if_current(epoch, &patch)
            .ok_or(ApiError::NotAuthenticated)
    }

    /// Exchanges the current token for a new one.
    ///
    /// A rejected refresh ends the session; a network failure does not.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::SessionExpired` when the backend rejects the
    /// refresh, `ApiError::NotAuthenticated` when logged out, or
    /// `ApiError::Transient` for network failures.
    #[instrument(skip_all)]
    pub async fn refresh_token(&self) -> Result<String, ApiError> {
        if !self.session.is_authenticated() {
            return Err(ApiError::NotAuthenticated);
        }
        let epoch = self.session.epoch();
        match self.backend.refresh_token().await {
            Ok(token) => {
                self.session.replace_token_if_current(epoch, &token);
                Ok(token)
            }
            Err(ApiError::SessionExpired) => {
                if self.session.epoch() == epoch {
                    self.session.logout();
                }
                Err(ApiError::SessionExpired)
            }
            Err(err) => Err(err),
        }
    }
}
