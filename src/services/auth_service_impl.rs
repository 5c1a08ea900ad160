//! `SeaORM` implementation of the `AuthService` trait.

use crate::db::Store;
use crate::services::auth_service::{
    AuthError, AuthService, LoginResult, SignupRequest, validate_signup,
};
use async_trait::async_trait;

pub struct SeaOrmAuthService {
    store: Store,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn signup(&self, request: SignupRequest) -> Result<LoginResult, AuthError> {
        validate_signup(&request)?;

        self.store
            .register_user(
                &request.username,
                &request.password,
                &request.security_question,
                &request.security_answer,
            )
            .await?;

        Ok(LoginResult {
            username: request.username,
        })
    }

    async fn login(&self, username: &str, password: &str) -> Result<LoginResult, AuthError> {
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::MissingFields);
        }

        if !self.store.check_user_pw(username, password).await? {
            return Err(AuthError::InvalidCredentials);
        }

        if !self.store.check_user_active_status(username).await? {
            return Err(AuthError::Inactive);
        }

        Ok(LoginResult {
            username: username.to_string(),
        })
    }

    async fn security_question(&self, username: &str) -> Result<String, AuthError> {
        Ok(self.store.get_security_question(username).await?)
    }
}
