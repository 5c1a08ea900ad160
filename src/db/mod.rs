use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use chrono::NaiveDateTime;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DatabaseTransaction, Statement,
    TransactionTrait,
};
use tokio::task;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::{LogEntries, NewLogEntry, SortOrder};
use crate::services::Credentials;

mod error;
pub mod repositories;
mod schema;
pub mod threading;

pub use error::StoreError;
pub use repositories::user::User;
pub use threading::ThreadingMode;

use repositories::log_entry::LogEntryRepository;

/// Largest LIMIT/OFFSET SQLite accepts (a signed 64-bit integer).
pub const MAX_ROW_BOUND: u64 = i64::MAX.unsigned_abs();
use repositories::user::{NewUser, UserRepository};

/// Owner of the embedded database.
///
/// Every public operation checks a connection out of the pool, runs inside
/// its own transaction, and commits on success. Errors roll the transaction
/// back before they are returned.
#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
    credentials: Credentials,
    threading: ThreadingMode,
}

impl Store {
    pub async fn new(db_url: &str, credentials: Credentials) -> Result<Self, StoreError> {
        Self::with_pool_options(db_url, 5, 1, credentials).await
    }

    pub async fn from_config(config: &Config) -> Result<Self, StoreError> {
        let credentials = Credentials::new(&config.security)?;
        Self::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
            credentials,
        )
        .await
    }

    /// Open the pool and refuse to continue if SQLite was built without
    /// thread safety. Does not create tables; see [`Store::setup`].
    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
        credentials: Credentials,
    ) -> Result<Self, StoreError> {
        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:").trim_start_matches("//");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                tokio::fs::File::create(path_str).await?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt)
            .await
            .map_err(|e| StoreError::storage("open", e))?;

        let threading = match threading::verify(&conn).await {
            Ok(mode) => mode,
            Err(e) => {
                tracing::error!("Refusing to start: {e}");
                conn.close().await.ok();
                return Err(e);
            }
        };

        info!(
            "Database connected (pool: {}-{}, sqlite {})",
            min_connections, max_connections, threading
        );

        Ok(Self {
            conn,
            credentials,
            threading,
        })
    }

    #[must_use]
    pub const fn threading_mode(&self) -> ThreadingMode {
        self.threading
    }

    async fn begin(&self, operation: &'static str) -> Result<DatabaseTransaction, StoreError> {
        self.conn
            .begin()
            .await
            .map_err(|e| StoreError::storage(operation, e))
    }

    /// Commit on success, roll back on failure.
    ///
    /// A failed rollback is only logged: the caller gets the first error
    /// and the connection drops the transaction when it is released.
    async fn finish<T>(
        txn: DatabaseTransaction,
        operation: &'static str,
        result: Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        match result {
            Ok(value) => {
                txn.commit()
                    .await
                    .map_err(|e| StoreError::storage(operation, e))?;
                Ok(value)
            }
            Err(err) => {
                debug!(operation, "Rolling back: {err}");
                if let Err(rollback_err) = txn.rollback().await {
                    warn!(operation, "Rollback failed: {rollback_err}");
                }
                Err(err)
            }
        }
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await
            .map_err(|e| StoreError::storage("ping", e))?;
        Ok(())
    }

    /// Create the `users` and `log_entries` tables if they do not exist.
    pub async fn setup(&self) -> Result<(), StoreError> {
        debug!("Setting up database schema");
        let txn = self.begin("setup").await?;
        let result = schema::create_if_absent(&txn)
            .await
            .map_err(|e| StoreError::storage("setup", e));
        Self::finish(txn, "setup", result).await
    }

    /// Drop every table. Data is gone afterwards; call [`Store::setup`] to
    /// start over.
    pub async fn reset(&self) -> Result<(), StoreError> {
        warn!("Resetting database");
        let txn = self.begin("reset").await?;
        let result = schema::drop_all(&txn)
            .await
            .map_err(|e| StoreError::storage("reset", e));
        Self::finish(txn, "reset", result).await
    }

    // ========== Users ==========

    pub async fn register_user(
        &self,
        username: &str,
        password: &str,
        security_q: &str,
        security_ans: &str,
    ) -> Result<(), StoreError> {
        debug!(username, "Registering user");

        let credentials = self.credentials.clone();
        let password = password.to_string();
        let password_hash = task::spawn_blocking(move || credentials.hash(&password)).await??;

        let txn = self.begin("register_user").await?;
        let result = UserRepository::new(&txn)
            .insert(NewUser {
                username: username.to_string(),
                password_hash,
                security_q: security_q.to_string(),
                security_ans: security_ans.to_string(),
            })
            .await;
        Self::finish(txn, "register_user", result).await?;

        info!(username, "User registered");
        Ok(())
    }

    /// Verify a password against the stored hash.
    /// Argon2 runs on the blocking pool after the transaction has closed.
    pub async fn check_user_pw(&self, username: &str, password: &str) -> Result<bool, StoreError> {
        let txn = self.begin("check_user_pw").await?;
        let result = UserRepository::new(&txn).get_password_hash(username).await;
        let hash = Self::finish(txn, "check_user_pw", result).await?;

        let credentials = self.credentials.clone();
        let password = password.to_string();
        let is_valid = task::spawn_blocking(move || credentials.verify(&password, &hash)).await?;

        Ok(is_valid)
    }

    pub async fn retrieve_usernames(&self) -> Result<BTreeSet<String>, StoreError> {
        let txn = self.begin("retrieve_usernames").await?;
        let result = UserRepository::new(&txn).usernames().await;
        let usernames = Self::finish(txn, "retrieve_usernames", result).await?;

        Ok(usernames.into_iter().collect())
    }

    pub async fn check_user_active_status(&self, username: &str) -> Result<bool, StoreError> {
        let txn = self.begin("check_user_active_status").await?;
        let result = UserRepository::new(&txn).get_by_username(username).await;
        let user = Self::finish(txn, "check_user_active_status", result).await?;

        Ok(user.is_active)
    }

    pub async fn get_user(&self, username: &str) -> Result<User, StoreError> {
        let txn = self.begin("get_user").await?;
        let result = UserRepository::new(&txn).get_by_username(username).await;
        Self::finish(txn, "get_user", result).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let txn = self.begin("list_users").await?;
        let result = UserRepository::new(&txn).list().await;
        Self::finish(txn, "list_users", result).await
    }

    pub async fn set_user_active(&self, username: &str, is_active: bool) -> Result<(), StoreError> {
        let txn = self.begin("set_user_active").await?;
        let result = UserRepository::new(&txn)
            .set_active(username, is_active)
            .await;
        Self::finish(txn, "set_user_active", result).await?;

        info!(username, is_active, "User active flag changed");
        Ok(())
    }

    pub async fn get_security_question(&self, username: &str) -> Result<String, StoreError> {
        self.get_user(username)
            .await
            .map(|user| user.security_question)
    }

    /// Plain comparison: security answers are stored as entered.
    pub async fn check_security_answer(
        &self,
        username: &str,
        answer: &str,
    ) -> Result<bool, StoreError> {
        let txn = self.begin("check_security_answer").await?;
        let result = UserRepository::new(&txn).get_security_answer(username).await;
        let stored = Self::finish(txn, "check_security_answer", result).await?;

        Ok(stored == answer)
    }

    // ========== Log Entries ==========

    pub async fn add_log_entry(
        &self,
        username: &str,
        start: &str,
        end: &str,
        notes: Option<&str>,
        timestamp: NaiveDateTime,
        car: Option<&str>,
    ) -> Result<(), StoreError> {
        let entry = NewLogEntry {
            username: username.to_string(),
            start: start.to_string(),
            end: end.to_string(),
            notes: notes.map(str::to_string),
            timestamp,
            car: car.map(str::to_string),
        };

        let txn = self.begin("add_log_entry").await?;
        let result = LogEntryRepository::new(&txn).insert(entry).await;
        let id = Self::finish(txn, "add_log_entry", result).await?;

        debug!(username, id, "Log entry added");
        Ok(())
    }

    /// Entries for `username` ordered by timestamp.
    ///
    /// `limit: None` means no limit. `offset` skips rows after sorting.
    /// Either bound above [`MAX_ROW_BOUND`] is rejected before querying.
    pub async fn fetch_log_entries(
        &self,
        username: &str,
        sort: SortOrder,
        limit: Option<u64>,
        offset: u64,
    ) -> Result<LogEntries, StoreError> {
        if let Some(limit) = limit.filter(|l| *l > MAX_ROW_BOUND) {
            return Err(StoreError::RowBoundOutOfRange {
                field: "limit",
                value: limit,
            });
        }
        if offset > MAX_ROW_BOUND {
            return Err(StoreError::RowBoundOutOfRange {
                field: "offset",
                value: offset,
            });
        }

        let txn = self.begin("fetch_log_entries").await?;
        let result = LogEntryRepository::new(&txn)
            .fetch(username, sort, limit, offset)
            .await;
        Self::finish(txn, "fetch_log_entries", result).await
    }

    pub async fn count_log_entries(&self, username: &str) -> Result<u64, StoreError> {
        let txn = self.begin("count_log_entries").await?;
        let result = LogEntryRepository::new(&txn).count(username).await;
        Self::finish(txn, "count_log_entries", result).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecurityConfig;
    use chrono::NaiveDate;

    fn cheap_credentials() -> Credentials {
        Credentials::new(&SecurityConfig {
            argon2_memory_cost_kib: 64,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
        })
        .unwrap()
    }

    async fn store() -> Store {
        let store = Store::new("sqlite::memory:", cheap_credentials()).await.unwrap();
        store.setup().await.unwrap();
        store
    }

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn test_threading_mode_is_verified_on_open() {
        let store = store().await;
        assert!(store.threading_mode().is_safe_for_pool());
    }

    #[tokio::test]
    async fn test_register_and_check_password() {
        let store = store().await;
        store
            .register_user("alice", "pw123!", "Q", "A")
            .await
            .unwrap();

        assert!(store.retrieve_usernames().await.unwrap().contains("alice"));
        assert!(store.check_user_pw("alice", "pw123!").await.unwrap());
        assert!(!store.check_user_pw("alice", "wrong").await.unwrap());
        assert!(store.check_user_active_status("alice").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_user_is_rejected() {
        let store = store().await;
        store.register_user("alice", "pw123!", "Q", "A").await.unwrap();

        let err = store
            .register_user("alice", "other-pw", "Q2", "A2")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateUser(ref name) if name == "alice"));

        // The first registration is untouched
        assert!(store.check_user_pw("alice", "pw123!").await.unwrap());
        assert_eq!(store.retrieve_usernames().await.unwrap().len(), 1);

        store.conn.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let store = store().await;

        assert!(matches!(
            store.check_user_pw("ghost", "pw").await,
            Err(StoreError::UserNotFound(_))
        ));
        assert!(matches!(
            store.check_user_active_status("ghost").await,
            Err(StoreError::UserNotFound(_))
        ));
        assert!(matches!(
            store.set_user_active("ghost", false).await,
            Err(StoreError::UserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_password_is_not_stored_in_plaintext() {
        use crate::entities::users;
        use sea_orm::EntityTrait;

        let store = store().await;
        store.register_user("alice", "pw123!", "Q", "A").await.unwrap();

        let row = users::Entity::find()
            .one(&store.conn)
            .await
            .unwrap()
            .unwrap();
        assert_ne!(row.password, b"pw123!".to_vec());
        assert!(row.password.starts_with(b"$argon2id$"));
    }

    #[tokio::test]
    async fn test_security_question_and_answer() {
        let store = store().await;
        store
            .register_user("alice", "pw123!", "First car?", "Mini")
            .await
            .unwrap();

        assert_eq!(
            store.get_security_question("alice").await.unwrap(),
            "First car?"
        );
        assert!(store.check_security_answer("alice", "Mini").await.unwrap());
        assert!(!store.check_security_answer("alice", "mini").await.unwrap());
    }

    #[tokio::test]
    async fn test_deactivate_user() {
        let store = store().await;
        store.register_user("alice", "pw123!", "Q", "A").await.unwrap();

        store.set_user_active("alice", false).await.unwrap();
        assert!(!store.check_user_active_status("alice").await.unwrap());

        store.set_user_active("alice", true).await.unwrap();
        assert!(store.check_user_active_status("alice").await.unwrap());
    }

    #[tokio::test]
    async fn test_ordering() {
        let store = store().await;
        // Inserted out of order on purpose
        for hour in [11, 9, 10] {
            store
                .add_log_entry("alice", "s", "e", None, at(hour), None)
                .await
                .unwrap();
        }

        let asc: Vec<_> = store
            .fetch_log_entries("alice", SortOrder::Asc, None, 0)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.datetime)
            .collect();
        assert_eq!(asc, vec![at(9), at(10), at(11)]);

        let desc: Vec<_> = store
            .fetch_log_entries("alice", SortOrder::Desc, None, 0)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.datetime)
            .collect();
        assert_eq!(desc, vec![at(11), at(10), at(9)]);
    }

    #[tokio::test]
    async fn test_pagination() {
        let store = store().await;
        for hour in 1..=5 {
            store
                .add_log_entry("alice", &format!("start {hour}"), "e", None, at(hour), None)
                .await
                .unwrap();
        }

        let page = store
            .fetch_log_entries("alice", SortOrder::Asc, Some(2), 2)
            .await
            .unwrap();
        let starts: Vec<_> = page.iter().map(|e| e.start.as_str()).collect();
        assert_eq!(starts, vec!["start 3", "start 4"]);

        let tail = store
            .fetch_log_entries("alice", SortOrder::Asc, None, 3)
            .await
            .unwrap();
        assert_eq!(tail.len(), 2);

        let past_end = store
            .fetch_log_entries("alice", SortOrder::Asc, Some(10), 50)
            .await
            .unwrap();
        assert!(past_end.is_empty());
    }

    #[tokio::test]
    async fn test_entries_are_scoped_to_user() {
        let store = store().await;
        store
            .add_log_entry("alice", "s", "e", None, at(1), None)
            .await
            .unwrap();
        store
            .add_log_entry("bobby", "s", "e", None, at(2), None)
            .await
            .unwrap();

        let entries = store
            .fetch_log_entries("alice", SortOrder::Asc, None, 0)
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(store.count_log_entries("bobby").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_setup_is_idempotent() {
        let store = store().await;
        store.register_user("alice", "pw123!", "Q", "A").await.unwrap();
        store
            .add_log_entry("alice", "s", "e", Some("n"), at(8), Some("car1"))
            .await
            .unwrap();

        store.setup().await.unwrap();

        assert!(store.retrieve_usernames().await.unwrap().contains("alice"));
        assert_eq!(store.count_log_entries("alice").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_transaction_leaves_no_rows() {
        let store = store().await;

        let txn = store.begin("add_log_entry").await.unwrap();
        let result: Result<(), StoreError> = async {
            LogEntryRepository::new(&txn)
                .insert(NewLogEntry {
                    username: "alice".to_string(),
                    start: "09:00".to_string(),
                    end: "17:00".to_string(),
                    notes: None,
                    timestamp: at(9),
                    car: None,
                })
                .await?;
            Err(StoreError::storage(
                "add_log_entry",
                sea_orm::DbErr::Custom("simulated failure".to_string()),
            ))
        }
        .await;

        let err = Store::finish(txn, "add_log_entry", result)
            .await
            .unwrap_err();
        assert!(err.is_storage());
        assert_eq!(store.count_log_entries("alice").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reset_drops_tables() {
        let store = store().await;
        store.register_user("alice", "pw123!", "Q", "A").await.unwrap();

        store.reset().await.unwrap();
        assert!(store.retrieve_usernames().await.unwrap_err().is_storage());

        store.setup().await.unwrap();
        assert!(store.retrieve_usernames().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_rejects_unrepresentable_bounds() {
        let store = store().await;
        store.register_user("alice", "pw123!", "Q", "A").await.unwrap();

        let result = store
            .fetch_log_entries("alice", SortOrder::Asc, Some(u64::MAX), 0)
            .await;
        assert!(matches!(
            result,
            Err(StoreError::RowBoundOutOfRange { field: "limit", .. })
        ));

        let result = store
            .fetch_log_entries("alice", SortOrder::Asc, None, MAX_ROW_BOUND + 1)
            .await;
        assert!(matches!(
            result,
            Err(StoreError::RowBoundOutOfRange { field: "offset", .. })
        ));

        let entries = store
            .fetch_log_entries("alice", SortOrder::Asc, Some(MAX_ROW_BOUND), MAX_ROW_BOUND)
            .await
            .unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registration_has_one_winner() {
        let db_path = std::env::temp_dir().join(format!(
            "logbook-store-test-{}.db",
            uuid::Uuid::new_v4()
        ));
        let store = Store::new(&format!("sqlite:{}", db_path.display()), cheap_credentials())
            .await
            .unwrap();
        store.setup().await.unwrap();

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.register_user("alice", "pw123!", "Q", "A").await })
            })
            .collect();

        let mut created = 0;
        let mut duplicates = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(()) => created += 1,
                Err(StoreError::DuplicateUser(name)) => {
                    assert_eq!(name, "alice");
                    duplicates += 1;
                }
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(created, 1);
        assert_eq!(duplicates, 7);
        assert_eq!(store.retrieve_usernames().await.unwrap().len(), 1);

        store.conn.close().await.unwrap();
        std::fs::remove_file(&db_path).ok();
    }

    #[tokio::test]
    async fn test_concrete_scenario() {
        let store = store().await;
        store.register_user("alice", "pw123!", "Q", "A").await.unwrap();
        assert!(store.retrieve_usernames().await.unwrap().contains("alice"));
        assert!(store.check_user_pw("alice", "pw123!").await.unwrap());
        assert!(!store.check_user_pw("alice", "wrong").await.unwrap());

        store
            .add_log_entry("alice", "09:00", "17:00", Some("worked"), at(17), Some("car1"))
            .await
            .unwrap();

        let entries = store
            .fetch_log_entries("alice", SortOrder::Asc, None, 0)
            .await
            .unwrap()
            .into_vec();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].car.as_deref(), Some("car1"));
        assert_eq!(entries[0].notes.as_deref(), Some("worked"));
        assert_eq!(entries[0].datetime, at(17));
    }
}
