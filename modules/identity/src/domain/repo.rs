use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::contract::model::{SearchUserQuery, SearchUserResult, User, UserStatus};
use crate::domain::error::StoreError;

/// Fully-formed row for insertion. The service computes hash, uuid and timestamps.
#[derive(Debug, Clone)]
pub struct NewUserRecord {
    pub uuid: Uuid,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub login_name: String,
    pub password_hash: String,
    pub salt: String,
    pub email: String,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

#[derive(Debug, Clone)]
pub struct UserNamesUpdate {
    pub id: i64,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub id: i64,
    pub status: UserStatus,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PasswordUpdate {
    pub id: i64,
    pub password_hash: String,
    pub salt: String,
    pub updated_at: DateTime<Utc>,
}

/// Port for the domain layer: persistence operations the domain needs.
/// Object-safe and async-friendly via `async_trait`.
#[async_trait]
pub trait UsersRepository: Send + Sync {
    /// True if any row already uses this login name.
    async fn is_user_taken(&self, login_name: &str) -> Result<bool, StoreError>;
    /// Insert and return the storage-assigned id.
    async fn create(&self, rec: NewUserRecord) -> Result<i64, StoreError>;
    /// `None` is a normal result, not an error.
    async fn get_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;
    async fn get_by_login(&self, login_name: &str) -> Result<Option<User>, StoreError>;
    /// `query.page` and `query.per_page` must already be resolved (both > 0).
    async fn search(&self, query: &SearchUserQuery) -> Result<SearchUserResult, StoreError>;
    async fn update(&self, upd: UserNamesUpdate) -> Result<(), StoreError>;
    async fn update_status(&self, upd: StatusUpdate) -> Result<(), StoreError>;
    async fn update_password(&self, upd: PasswordUpdate) -> Result<(), StoreError>;
}
