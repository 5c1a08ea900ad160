//! Domain service for signup and login.
//!
//! Rejections carry a distinct variant per reason so the web layer can phrase
//! them. Storage failures are kept opaque.

use serde::Serialize;
use thiserror::Error;

use crate::db::StoreError;

pub const USERNAME_LENGTH: std::ops::RangeInclusive<usize> = 4..=25;
pub const PASSWORD_LENGTH: std::ops::RangeInclusive<usize> = 6..=35;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("All fields are required to be filled!")]
    MissingFields,

    #[error("Passwords do not match!")]
    PasswordMismatch,

    #[error("Username must be between 4 and 25 characters long!")]
    InvalidUsernameLength,

    #[error("Password must be between 6 and 35 characters long!")]
    InvalidPasswordLength,

    #[error("Username already exists!")]
    UsernameTaken,

    #[error("Username doesn't exist!")]
    UnknownUser,

    #[error("Incorrect password!")]
    InvalidCredentials,

    #[error("This account has been deactivated")]
    Inactive,

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateUser(_) => Self::UsernameTaken,
            StoreError::UserNotFound(_) => Self::UnknownUser,
            other => Self::Store(other),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
    pub password_confirm: String,
    pub security_question: String,
    pub security_answer: String,
}

/// Login result containing the authenticated principal.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub username: String,
}

/// Field checks for a signup form, in the order the user sees them.
pub fn validate_signup(request: &SignupRequest) -> Result<(), AuthError> {
    if request.password != request.password_confirm {
        return Err(AuthError::PasswordMismatch);
    }

    if request.username.is_empty()
        || request.password.is_empty()
        || request.security_question.is_empty()
        || request.security_answer.is_empty()
    {
        return Err(AuthError::MissingFields);
    }

    if !USERNAME_LENGTH.contains(&request.username.chars().count()) {
        return Err(AuthError::InvalidUsernameLength);
    }

    if !PASSWORD_LENGTH.contains(&request.password.chars().count()) {
        return Err(AuthError::InvalidPasswordLength);
    }

    Ok(())
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Validates the form and creates the account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UsernameTaken`] if the username is registered.
    async fn signup(&self, request: SignupRequest) -> Result<LoginResult, AuthError>;

    /// Verifies credentials and the account's active flag.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UnknownUser`], [`AuthError::InvalidCredentials`]
    /// or [`AuthError::Inactive`] when login is refused.
    async fn login(&self, username: &str, password: &str) -> Result<LoginResult, AuthError>;

    /// Gets the recovery question chosen at signup.
    async fn security_question(&self, username: &str) -> Result<String, AuthError>;
}
