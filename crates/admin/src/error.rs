//! Unified error handling for the admin API.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::DirectoryError;

/// Application-level error type for the admin API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Store operation failed.
    #[error("Database error: {0}")]
    Database(#[source] RepositoryError),

    /// Identity provider directory could not be queried.
    #[error("Identity provider error: {0}")]
    IdentityProvider(String),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("{0}")]
    Unauthorized(String),

    /// User lacks permission.
    #[error("{0}")]
    Forbidden(String),

    /// Resource already exists.
    #[error("{0}")]
    Conflict(String),

    /// Bad request from client.
    #[error("{0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DirectoryError> for AppError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Unauthenticated(m) => Self::Unauthorized(m),
            DirectoryError::Forbidden(m) => Self::Forbidden(m),
            DirectoryError::NotFound(m) => Self::NotFound(m),
            DirectoryError::Conflict(m) => Self::Conflict(m),
            DirectoryError::InvalidInput(m) => Self::BadRequest(m),
            DirectoryError::IdentityProvider(e) => Self::IdentityProvider(e.to_string()),
            DirectoryError::StoreUnavailable(e) => Self::Database(e),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if matches!(
            self,
            Self::Database(_) | Self::Internal(_) | Self::IdentityProvider(_)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        let status = match &self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IdentityProvider(_) => StatusCode::BAD_GATEWAY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = match &self {
            Self::Database(e) => ErrorBody {
                message: "Internal server error".to_string(),
                error: Some(e.to_string()),
            },
            Self::Internal(e) => ErrorBody {
                message: "Internal server error".to_string(),
                error: Some(e.clone()),
            },
            Self::IdentityProvider(e) => ErrorBody {
                message: "Identity provider error".to_string(),
                error: Some(e.clone()),
            },
            _ => ErrorBody {
                message: self.to_string(),
                error: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Set the Sentry user context from a verified uid.
pub fn set_sentry_user(uid: &str, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(uid.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}
