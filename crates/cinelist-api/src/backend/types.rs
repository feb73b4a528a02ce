//! Backend request/response types.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::error::ApiError;

/// Minimum accepted password length at registration.
const MIN_PASSWORD_LEN: usize = 6;

/// Which personal collection an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    /// Favorite movies.
    Favorites,
    /// Movies to watch later.
    Watchlist,
}

impl ListKind {
    /// Both list kinds, in display order.
    pub const ALL: [Self; 2] = [Self::Favorites, Self::Watchlist];

    /// Name used for the endpoint path, the response field, and the storage key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Favorites => "favorites",
            Self::Watchlist => "watchlist",
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A movie saved in a personal list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    /// TMDB movie ID.
    pub id: u64,
    /// Movie title.
    #[serde(default)]
    pub title: String,
    /// Poster image path.
    #[serde(default)]
    pub poster_path: Option<String>,
    /// Release date (YYYY-MM-DD).
    #[serde(default)]
    pub release_date: Option<String>,
    /// Vote average.
    #[serde(default)]
    pub vote_average: Option<f64>,
    /// Overview text.
    #[serde(default)]
    pub overview: Option<String>,
}

impl ListItem {
    /// Creates an item with only an ID and title.
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            poster_path: None,
            release_date: None,
            vote_average: None,
            overview: None,
        }
    }
}

/// Login request body.
#[derive(Clone, Serialize)]
pub struct Credentials {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
}

impl Credentials {
    /// Creates credentials from an email and password.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[HIDDEN]")
            .finish()
    }
}

/// Registration request body.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    /// Display name.
    pub full_name: String,
    /// Account email.
    pub email: String,
    /// Chosen password.
    pub password: String,
    /// Password confirmation.
    pub confirm_password: String,
}

impl Registration {
    /// Checks the form locally before it is sent.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` when a field is empty, the passwords
    /// differ, or the password is shorter than six characters.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.full_name.trim().is_empty() {
            return Err(ApiError::InvalidInput(String::from("Full name is required")));
        }
        if self.email.trim().is_empty() {
            return Err(ApiError::InvalidInput(String::from("Email is required")));
        }
        if self.password != self.confirm_password {
            return Err(ApiError::InvalidInput(String::from("Passwords do not match")));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ApiError::InvalidInput(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters long"
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .field("password", &"[HIDDEN]")
            .field("confirm_password", &"[HIDDEN]")
            .finish()
    }
}

/// User profile as returned by the backend.
///
/// Fields this client does not know about are kept in `extra` so the
/// profile survives a round trip through local storage unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Backend user ID.
    #[serde(alias = "_id", deserialize_with = "string_or_number")]
    pub id: String,
    /// Display name.
    #[serde(default, alias = "fullName")]
    pub name: String,
    /// Account email.
    #[serde(default)]
    pub email: String,
    /// Profile picture URL.
    #[serde(
        default,
        rename = "profilePicture",
        skip_serializing_if = "Option::is_none"
    )]
    pub profile_picture: Option<String>,
    /// Unknown fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    /// Applies the non-empty fields of `patch` to this profile.
    pub fn apply(&mut self, patch: &ProfilePatch) {
        if let Some(ref name) = patch.name {
            self.name.clone_from(name);
        }
        if let Some(ref email) = patch.email {
            self.email.clone_from(email);
        }
        if let Some(ref picture) = patch.profile_picture {
            self.profile_picture = Some(picture.clone());
        }
    }
}

/// Accepts the user ID as either a JSON string or number.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number for user id, got {other}"
        ))),
    }
}

/// Partial profile update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfilePatch {
    /// New display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// New profile picture URL.
    #[serde(rename = "profilePicture", skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

impl ProfilePatch {
    /// Whether the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.profile_picture.is_none()
    }
}

/// Image file sent to the profile picture endpoint.
#[derive(Clone)]
pub struct PictureUpload {
    /// File name reported to the backend.
    pub file_name: String,
    /// MIME type (e.g. `image/png`).
    pub mime_type: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl fmt::Debug for PictureUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PictureUpload")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Successful login response.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    /// Bearer token.
    pub token: Option<String>,
    /// Logged-in user.
    pub user: Option<User>,
}

/// Token refresh response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RefreshResponse {
    pub token: Option<String>,
}

/// Response wrapping a user profile (`PUT users/update`, picture upload).
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UserResponse {
    pub user: Option<User>,
}

/// Extracts the list under the `kind` field of a list endpoint response.
///
/// A missing field means the backend returned no list, which is treated as empty.
pub(crate) fn parse_list_body(kind: ListKind, body: &str) -> Result<Vec<ListItem>, ApiError> {
    let mut value: Value = serde_json::from_str(body)
        .map_err(|e| ApiError::Decode(format!("{kind}: invalid JSON: {e}")))?;
    let Some(items) = value.get_mut(kind.as_str()).map(Value::take) else {
        return Ok(Vec::new());
    };
    if items.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(items).map_err(|e| ApiError::Decode(format!("{kind}: {e}")))
}
