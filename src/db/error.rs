use sea_orm::DbErr;
use thiserror::Error;

use crate::services::credentials::CredentialError;

/// Errors surfaced by [`super::Store`].
///
/// `DuplicateUser` and `UserNotFound` are caller mistakes and safe to phrase
/// for an end user. Everything else is internal.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("User '{0}' already exists")]
    DuplicateUser(String),

    #[error("User '{0}' not found")]
    UserNotFound(String),

    #[error("Database error during {operation}: {source}")]
    Storage {
        operation: &'static str,
        #[source]
        source: DbErr,
    },

    #[error("SQLite threading mode {mode} is unsafe for multi-threaded access")]
    UnsafeConcurrencyConfiguration { mode: String },

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("Stored timestamp '{value}' is malformed")]
    MalformedTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("{field} {value} exceeds the largest SQLite row bound")]
    RowBoundOutOfRange { field: &'static str, value: u64 },

    #[error("Failed to prepare database file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Password hashing task panicked")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl StoreError {
    /// Wrap an engine error, logging it with the operation that failed.
    pub fn storage(operation: &'static str, source: DbErr) -> Self {
        tracing::error!(operation, error = %source, "Database error");
        Self::Storage { operation, source }
    }

    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }
}
