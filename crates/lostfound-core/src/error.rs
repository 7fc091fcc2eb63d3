//! # Error Module
//!
//! The single error taxonomy of the catalog engine.
//!
//! Every fallible core operation returns [`Result`]. Storage and codec
//! failures are flattened into string-carrying variants so the error stays
//! `Clone + Eq` and can cross the app boundary unchanged.

use thiserror::Error;

/// Errors produced by the catalog engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LostFoundError {
    /// A record does not exist (or is not visible to the caller).
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },

    /// The caller is not allowed to perform the action.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Input failed field validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The action collides with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The requested status change is not allowed from the current status.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// The storage backend failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Encoding or decoding a record failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Filesystem I/O failed.
    #[error("io error: {0}")]
    Io(String),
}

impl LostFoundError {
    /// Shorthand for a [`LostFoundError::NotFound`].
    #[must_use]
    pub fn not_found(kind: &'static str, id: u64) -> Self {
        Self::NotFound { kind, id }
    }

    /// Stable machine-readable code, used in API error bodies.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Forbidden(_) => "forbidden",
            Self::Validation(_) => "validation_failed",
            Self::Conflict(_) => "conflict",
            Self::InvalidTransition(_) => "invalid_transition",
            Self::Storage(_) => "storage_error",
            Self::Serialization(_) => "serialization_error",
            Self::Io(_) => "io_error",
        }
    }
}

impl From<redb::Error> for LostFoundError {
    fn from(err: redb::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<postcard::Error> for LostFoundError {
    fn from(err: postcard::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for LostFoundError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result alias used across the core crate.
pub type Result<T> = std::result::Result<T, LostFoundError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_kind_and_id() {
        let err = LostFoundError::not_found("item", 7);
        assert_eq!(err.to_string(), "item 7 not found");
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = LostFoundError::from(io);
        assert!(matches!(err, LostFoundError::Io(_)));
    }
}
