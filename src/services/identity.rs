//! Request-scoped view of the current principal.
//!
//! An [`Identity`] is built once per request from the session and handed to
//! whatever needs it. It snapshots the account's active flag at construction
//! and never changes afterwards.

use chrono::{NaiveDateTime, Utc};
use thiserror::Error;

use crate::db::{MAX_ROW_BOUND, Store, StoreError};
use crate::models::{LogEntries, SortOrder};

/// Entries per page in the log display.
pub const LOG_PAGE_SIZE: u64 = 10;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Not logged in")]
    Anonymous,

    #[error("Page number out of range (pages start at 1)")]
    InvalidPage,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// `(limit, offset)` for a 1-indexed page.
///
/// `None` for page 0 and for pages whose offset SQLite cannot represent.
#[must_use]
pub const fn page_window(page: u64) -> Option<(u64, u64)> {
    if page == 0 {
        return None;
    }
    match (page - 1).checked_mul(LOG_PAGE_SIZE) {
        Some(offset) if offset <= MAX_ROW_BOUND => Some((LOG_PAGE_SIZE, offset)),
        _ => None,
    }
}

#[derive(Clone)]
pub struct Identity {
    username: String,
    authenticated: bool,
    active: bool,
    store: Store,
}

impl Identity {
    /// Build an identity for `username`, loading its active flag.
    ///
    /// An empty username yields an anonymous identity without touching the
    /// database. `credential` alone decides [`Identity::is_authenticated`],
    /// for anonymous identities too; it is not checked against the stored
    /// hash here.
    pub async fn load(
        store: Store,
        username: impl Into<String>,
        credential: &str,
    ) -> Result<Self, StoreError> {
        let username = username.into();
        if username.is_empty() {
            return Ok(Self {
                authenticated: !credential.is_empty(),
                ..Self::anonymous(store)
            });
        }

        let active = store.check_user_active_status(&username).await?;

        Ok(Self {
            username,
            authenticated: !credential.is_empty(),
            active,
            store,
        })
    }

    #[must_use]
    pub const fn anonymous(store: Store) -> Self {
        Self {
            username: String::new(),
            authenticated: false,
            active: false,
            store,
        }
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.username.is_empty()
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    fn owner(&self) -> Result<&str, IdentityError> {
        if self.is_anonymous() {
            return Err(IdentityError::Anonymous);
        }
        Ok(&self.username)
    }

    /// Append an entry stamped with the current UTC time.
    pub async fn add_log_entry(
        &self,
        start: &str,
        end: &str,
        notes: Option<&str>,
        car: Option<&str>,
    ) -> Result<NaiveDateTime, IdentityError> {
        let timestamp = Utc::now().naive_utc();
        self.add_log_entry_at(start, end, notes, car, timestamp)
            .await?;
        Ok(timestamp)
    }

    pub async fn add_log_entry_at(
        &self,
        start: &str,
        end: &str,
        notes: Option<&str>,
        car: Option<&str>,
        timestamp: NaiveDateTime,
    ) -> Result<(), IdentityError> {
        let owner = self.owner()?;
        self.store
            .add_log_entry(owner, start, end, notes, timestamp, car)
            .await?;
        Ok(())
    }

    /// One page of entries, newest first.
    pub async fn get_log_display(&self, page: u64) -> Result<LogEntries, IdentityError> {
        let owner = self.owner()?;
        let (limit, offset) = page_window(page).ok_or(IdentityError::InvalidPage)?;

        Ok(self
            .store
            .fetch_log_entries(owner, SortOrder::Desc, Some(limit), offset)
            .await?)
    }

    /// Every entry, newest first.
    pub async fn get_complete_logs(&self) -> Result<LogEntries, IdentityError> {
        let owner = self.owner()?;

        Ok(self
            .store
            .fetch_log_entries(owner, SortOrder::Desc, None, 0)
            .await?)
    }

    pub async fn page_count(&self) -> Result<u64, IdentityError> {
        let owner = self.owner()?;
        let total = self.store.count_log_entries(owner).await?;
        Ok(total.div_ceil(LOG_PAGE_SIZE).max(1))
    }
}
