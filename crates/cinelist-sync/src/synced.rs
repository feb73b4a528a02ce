//! Optimistic results with an optional replication warning.

use std::fmt;

use cinelist_api::backend::{ApiError, ErrorKind};

/// A remote failure that was recorded instead of returned as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncWarning {
    /// Error category.
    pub kind: ErrorKind,
    /// Human readable description.
    pub message: String,
}

impl From<&ApiError> for SyncWarning {
    fn from(err: &ApiError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for SyncWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

/// Value of an optimistic operation plus the replication warning, if any.
///
/// The value is always the local state after the operation; a warning means
/// the backend did not confirm it.
#[derive(Debug, Clone, PartialEq)]
pub struct Synced<T> {
    /// Local state after the operation.
    pub value: T,
    /// Replication failure, if the backend did not confirm the change.
    pub warning: Option<SyncWarning>,
}

impl<T> Synced<T> {
    /// A result the backend confirmed, or that needed no backend call.
    pub const fn clean(value: T) -> Self {
        Self {
            value,
            warning: None,
        }
    }

    /// A result whose replication failed.
    pub const fn warned(value: T, warning: SyncWarning) -> Self {
        Self {
            value,
            warning: Some(warning),
        }
    }

    /// Whether replication succeeded.
    pub const fn is_clean(&self) -> bool {
        self.warning.is_none()
    }
}
