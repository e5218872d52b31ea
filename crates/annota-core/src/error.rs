//! Error types for annota.

use thiserror::Error;
use uuid::Uuid;

use crate::validation::ValidationErrors;

/// Result type alias using annota's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for annota operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error). Fatal to the enclosing
    /// transaction.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// One or more validation steps rejected the write.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// A revert that the caller required to succeed was rejected.
    #[error("Revert of note {note_id} failed: {errors}")]
    RevertFailed {
        note_id: Uuid,
        errors: ValidationErrors,
    },

    /// Note not found
    #[error("Note not found: {0}")]
    NoteNotFound(Uuid),

    /// Version not found, or not a version of the given note
    #[error("Version {version_id} not found for note {note_id}")]
    VersionNotFound { note_id: Uuid, version_id: Uuid },

    /// Post (image) not found
    #[error("Post not found: {0}")]
    PostNotFound(Uuid),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Field-level validation detail, if this is a recoverable validation error.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Error::Validation(errors) => Some(errors),
            _ => None,
        }
    }

    /// Whether the error is a not-found condition of any kind.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::NoteNotFound(_)
                | Error::VersionNotFound { .. }
                | Error::PostNotFound(_)
                | Error::NotFound(_)
        )
    }
}

impl From<ValidationErrors> for Error {
    fn from(errors: ValidationErrors) -> Self {
        Error::Validation(errors)
    }
}
