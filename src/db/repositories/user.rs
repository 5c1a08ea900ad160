use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, SqlErr,
};

use crate::db::StoreError;
use crate::entities::{prelude::*, users};

/// User data returned from repository (without sensitive password hash)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub is_active: bool,
    pub security_question: String,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            is_active: model.is_active,
            security_question: model.security_q,
        }
    }
}

/// Row fields for a new account. The password must already be hashed.
pub struct NewUser {
    pub username: String,
    pub password_hash: Vec<u8>,
    pub security_q: String,
    pub security_ans: String,
}

/// User queries, run on whatever connection or transaction it is given.
pub struct UserRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> UserRepository<'a, C> {
    #[must_use]
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    async fn find(&self, username: &str, operation: &'static str) -> Result<users::Model, StoreError> {
        Users::find()
            .filter(users::Column::Username.eq(username))
            .one(self.conn)
            .await
            .map_err(|e| StoreError::storage(operation, e))?
            .ok_or_else(|| StoreError::UserNotFound(username.to_string()))
    }

    /// Insert a user. The UNIQUE constraint on `username` is the only
    /// duplicate check.
    pub async fn insert(&self, user: NewUser) -> Result<(), StoreError> {
        let username = user.username.clone();
        let active = users::ActiveModel {
            username: Set(user.username),
            password: Set(user.password_hash),
            is_active: Set(true),
            security_q: Set(user.security_q),
            security_ans: Set(user.security_ans),
            ..Default::default()
        };

        match Users::insert(active).exec(self.conn).await {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(StoreError::DuplicateUser(username)),
            Err(e) => Err(StoreError::storage("register_user", e)),
        }
    }

    pub async fn get_by_username(&self, username: &str) -> Result<User, StoreError> {
        self.find(username, "get_user").await.map(User::from)
    }

    pub async fn get_password_hash(&self, username: &str) -> Result<Vec<u8>, StoreError> {
        self.find(username, "check_user_pw")
            .await
            .map(|user| user.password)
    }

    pub async fn get_security_answer(&self, username: &str) -> Result<String, StoreError> {
        self.find(username, "check_security_answer")
            .await
            .map(|user| user.security_ans)
    }

    pub async fn usernames(&self) -> Result<Vec<String>, StoreError> {
        Users::find()
            .select_only()
            .column(users::Column::Username)
            .into_tuple::<String>()
            .all(self.conn)
            .await
            .map_err(|e| StoreError::storage("retrieve_usernames", e))
    }

    pub async fn list(&self) -> Result<Vec<User>, StoreError> {
        let users = Users::find()
            .order_by_asc(users::Column::Username)
            .all(self.conn)
            .await
            .map_err(|e| StoreError::storage("list_users", e))?;

        Ok(users.into_iter().map(User::from).collect())
    }

    pub async fn set_active(&self, username: &str, is_active: bool) -> Result<(), StoreError> {
        let user = self.find(username, "set_user_active").await?;

        let mut active: users::ActiveModel = user.into();
        active.is_active = Set(is_active);
        active
            .update(self.conn)
            .await
            .map_err(|e| StoreError::storage("set_user_active", e))?;

        Ok(())
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
