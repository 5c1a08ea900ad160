//! One-way password hashing and verification.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;

use crate::config::SecurityConfig;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Invalid Argon2 params: {0}")]
    InvalidParams(String),

    #[error("Failed to hash password: {0}")]
    Hash(String),
}

/// Argon2id hasher with the configured cost parameters.
#[derive(Debug, Clone)]
pub struct Credentials {
    params: Params,
}

impl Credentials {
    pub fn new(config: &SecurityConfig) -> Result<Self, CredentialError> {
        let params = Params::new(
            config.argon2_memory_cost_kib,
            config.argon2_time_cost,
            config.argon2_parallelism,
            None,
        )
        .map_err(|e| CredentialError::InvalidParams(e.to_string()))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password with a fresh random salt.
    ///
    /// The result is the PHC string encoding as bytes, which carries the salt
    /// and parameters needed by [`Credentials::verify`].
    pub fn hash(&self, password: &str) -> Result<Vec<u8>, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| CredentialError::Hash(e.to_string()))?;

        Ok(hash.to_string().into_bytes())
    }

    /// Verify a password against a stored hash.
    ///
    /// Parameters are read from the stored hash, so hashes produced under an
    /// older cost setting keep verifying. A malformed hash never verifies.
    #[must_use]
    pub fn verify(&self, password: &str, hash: &[u8]) -> bool {
        let Ok(encoded) = std::str::from_utf8(hash) else {
            tracing::warn!("Stored password hash is not valid UTF-8");
            return false;
        };

        let parsed = match PasswordHash::new(encoded) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid password hash format: {e}");
                return false;
            }
        };

        self.argon2()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}
