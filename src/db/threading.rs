//! Startup check that the linked SQLite library tolerates access from
//! several threads.

use std::fmt;

use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};

use super::StoreError;

const THREADSAFE_QUERY: &str = "SELECT compile_options FROM pragma_compile_options \
     WHERE compile_options LIKE 'THREADSAFE=%'";

/// Value of SQLite's `THREADSAFE` compile option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadingMode {
    /// `THREADSAFE=0`: all mutexes compiled out.
    SingleThread,
    /// `THREADSAFE=1`: every connection is guarded by its own mutex.
    Serialized,
    /// `THREADSAFE=2`: safe as long as no connection is used by two threads at once.
    MultiThread,
}

impl ThreadingMode {
    #[must_use]
    pub fn from_compile_option(option: &str) -> Option<Self> {
        let value = option.trim().strip_prefix("THREADSAFE=")?;
        match value.parse::<u8>().ok()? {
            0 => Some(Self::SingleThread),
            1 => Some(Self::Serialized),
            2 => Some(Self::MultiThread),
            _ => None,
        }
    }

    /// The pool hands each connection to one task at a time, so multi-thread
    /// mode is sufficient.
    #[must_use]
    pub const fn is_safe_for_pool(self) -> bool {
        !matches!(self, Self::SingleThread)
    }
}

impl fmt::Display for ThreadingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SingleThread => write!(f, "single-thread (THREADSAFE=0)"),
            Self::Serialized => write!(f, "serialized (THREADSAFE=1)"),
            Self::MultiThread => write!(f, "multi-thread (THREADSAFE=2)"),
        }
    }
}

/// Decide from the raw compile option whether the store may start.
pub fn ensure_thread_safe(option: Option<&str>) -> Result<ThreadingMode, StoreError> {
    let Some(option) = option else {
        return Err(StoreError::UnsafeConcurrencyConfiguration {
            mode: "unknown (THREADSAFE option not reported)".to_string(),
        });
    };

    match ThreadingMode::from_compile_option(option) {
        Some(mode) if mode.is_safe_for_pool() => Ok(mode),
        Some(mode) => Err(StoreError::UnsafeConcurrencyConfiguration {
            mode: mode.to_string(),
        }),
        None => Err(StoreError::UnsafeConcurrencyConfiguration {
            mode: format!("unrecognised ({option})"),
        }),
    }
}

pub async fn verify(conn: &DatabaseConnection) -> Result<ThreadingMode, StoreError> {
    let backend = conn.get_database_backend();
    let row = conn
        .query_one(Statement::from_string(backend, THREADSAFE_QUERY.to_string()))
        .await
        .map_err(|e| StoreError::storage("threading_check", e))?;

    let option = row
        .map(|r| r.try_get::<String>("", "compile_options"))
        .transpose()
        .map_err(|e| StoreError::storage("threading_check", e))?;

    ensure_thread_safe(option.as_deref())
}
