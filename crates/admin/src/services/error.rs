//! Admin directory error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::identity::IdentityError;

/// Errors returned by the admin directory and account services.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Missing or invalid credential.
    #[error("{0}")]
    Unauthenticated(String),

    /// Verified caller lacks the required capability.
    #[error("{0}")]
    Forbidden(String),

    /// Referenced user or account does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The target already holds the record being created.
    #[error("{0}")]
    Conflict(String),

    /// Request input failed validation.
    #[error("{0}")]
    InvalidInput(String),

    /// The identity provider's directory could not be queried.
    #[error("identity provider error: {0}")]
    IdentityProvider(#[source] IdentityError),

    /// The store failed.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[source] RepositoryError),
}

impl From<RepositoryError> for DirectoryError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(message) => Self::Conflict(message),
            other => Self::StoreUnavailable(other),
        }
    }
}
