//! Typed errors returned by the backend client.

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

/// Why a login attempt was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// Wrong email/password combination.
    InvalidCredentials,
    /// No account exists for the given email.
    UserNotFound,
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredentials => write!(f, "invalid credentials"),
            Self::UserNotFound => write!(f, "user not found"),
        }
    }
}

/// Coarse error category, for callers that only need to branch on the class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad credentials or unknown user; the user can correct it.
    AuthFailed,
    /// The session can no longer be used; a new login is required.
    SessionExpired,
    /// Timeout, refused connection, or 5xx; retry later.
    TransientNetwork,
    /// The backend refused the request (non-401 4xx, or an unusable body).
    RemoteRejected,
    /// The request never left the client (not logged in, invalid input).
    Client,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AuthFailed => "auth_failed",
            Self::SessionExpired => "session_expired",
            Self::TransientNetwork => "transient_network",
            Self::RemoteRejected => "remote_rejected",
            Self::Client => "client",
        };
        f.write_str(name)
    }
}

/// Error returned by backend operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Login refused.
    #[error("login failed ({reason}): {message}")]
    AuthFailed {
        /// Refusal reason.
        reason: AuthFailure,
        /// Message reported by the backend.
        message: String,
    },

    /// Token refresh was rejected with 401/403.
    #[error("session expired, please log in again")]
    SessionExpired,

    /// A 401 that a token refresh could not cure.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Network failure, timeout, or server-side (5xx) error.
    #[error("network error: {0}")]
    Transient(String),

    /// Non-401 4xx response.
    #[error("request rejected (HTTP {status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Message reported by the backend.
        message: String,
    },

    /// The operation requires a logged-in session.
    #[error("not logged in")]
    NotAuthenticated,

    /// Input failed local validation.
    #[error("{0}")]
    InvalidInput(String),

    /// The response body could not be decoded.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Returns the coarse category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::AuthFailed { .. } => ErrorKind::AuthFailed,
            Self::SessionExpired | Self::Unauthorized(_) => ErrorKind::SessionExpired,
            Self::Transient(_) => ErrorKind::TransientNetwork,
            Self::Rejected { .. } | Self::Decode(_) => ErrorKind::RemoteRejected,
            Self::NotAuthenticated | Self::InvalidInput(_) => ErrorKind::Client,
        }
    }

    /// Whether the backend answered 404.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Rejected { status: 404, .. })
    }

    /// Builds an error from a transport-level `reqwest` failure.
    pub(crate) fn from_transport(err: &reqwest::Error, path: &str) -> Self {
        if err.is_decode() {
            return Self::Decode(format!("{path}: {err}"));
        }
        if err.is_timeout() {
            return Self::Transient(format!("{path}: request timed out"));
        }
        Self::Transient(format!("{path}: {err}"))
    }

    /// Builds an error from a non-success HTTP status and its body.
    pub(crate) fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = extract_message(body);
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Self::Unauthorized(message);
        }
        if status.is_server_error() {
            return Self::Transient(format!("HTTP {status}: {message}"));
        }
        Self::Rejected {
            status: status.as_u16(),
            message,
        }
    }

    /// Reinterprets a failed login response as a typed auth failure.
    ///
    /// 404, or a message saying the account does not exist, means the user
    /// is unknown; other 400/401/403 answers mean the credentials are wrong.
    /// Anything else (network, 5xx) is passed through unchanged.
    #[must_use]
    pub(crate) fn into_login_failure(self) -> Self {
        let (status, message) = match self {
            Self::Unauthorized(message) => (401, message),
            Self::Rejected { status, message } => (status, message),
            other => return other,
        };
        let reason = if status == 404 || mentions_missing_user(&message) {
            AuthFailure::UserNotFound
        } else if matches!(status, 400 | 401 | 403) {
            AuthFailure::InvalidCredentials
        } else {
            return Self::Rejected { status, message };
        };
        Self::AuthFailed { reason, message }
    }
}

/// Error body shape used by the backend.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// Pulls a human readable message out of an error body.
fn extract_message(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body)
        && let Some(message) = parsed.message.or(parsed.error)
    {
        return message;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        String::from("<empty body>")
    } else {
        String::from(trimmed)
    }
}

fn mentions_missing_user(message: &str) -> bool {
    let lower = message.to_lowercase();
    ["not found", "not registered", "does not exist", "no user"]
        .iter()
        .any(|needle| lower.contains(needle))
}
