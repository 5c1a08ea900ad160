use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::ApiResponse;
use crate::db::StoreError;
use crate::services::{AuthError, IdentityError};

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),

    DatabaseError(String),

    ValidationError(String),

    Conflict(String),

    InternalError(String),

    Unauthorized(String),

    Forbidden(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(msg) => write!(f, "Not found: {msg}"),
            Self::DatabaseError(msg) => write!(f, "Database error: {msg}"),
            Self::ValidationError(msg) => write!(f, "Validation error: {msg}"),
            Self::Conflict(msg) => write!(f, "Conflict: {msg}"),
            Self::InternalError(msg) => write!(f, "Internal error: {msg}"),
            Self::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            Self::Forbidden(msg) => write!(f, "Forbidden: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            Self::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            Self::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
        };

        let body = ApiResponse::<()>::error(error_message);
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateUser(name) => Self::Conflict(format!("User '{name}' already exists")),
            StoreError::UserNotFound(name) => Self::NotFound(format!("User '{name}' not found")),
            e @ StoreError::RowBoundOutOfRange { .. } => Self::ValidationError(e.to_string()),
            e if e.is_storage() => Self::DatabaseError(e.to_string()),
            e => Self::InternalError(e.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingFields
            | AuthError::PasswordMismatch
            | AuthError::InvalidUsernameLength
            | AuthError::InvalidPasswordLength => Self::ValidationError(err.to_string()),
            AuthError::UsernameTaken => Self::Conflict(err.to_string()),
            AuthError::UnknownUser | AuthError::InvalidCredentials => {
                Self::Unauthorized(err.to_string())
            }
            AuthError::Inactive => Self::Forbidden(err.to_string()),
            AuthError::Store(e) => e.into(),
        }
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Anonymous => Self::Unauthorized("Not authenticated".to_string()),
            IdentityError::InvalidPage => Self::ValidationError(err.to_string()),
            IdentityError::Store(e) => e.into(),
        }
    }
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_errors_are_opaque() {
        let err = ApiError::from(StoreError::storage(
            "add_log_entry",
            sea_orm::DbErr::Custom("disk I/O error at page 42".to_string()),
        ));
        assert!(matches!(err, ApiError::DatabaseError(_)));

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_auth_reasons_keep_their_status() {
        let cases = [
            (AuthError::PasswordMismatch, StatusCode::BAD_REQUEST),
            (AuthError::UsernameTaken, StatusCode::CONFLICT),
            (AuthError::UnknownUser, StatusCode::UNAUTHORIZED),
            (AuthError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AuthError::Inactive, StatusCode::FORBIDDEN),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }
}
