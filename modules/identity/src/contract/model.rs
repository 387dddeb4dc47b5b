use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Account state. Transitions only through `update_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UserStatus {
    Active,
    Inactive,
    #[default]
    Pending,
}

impl UserStatus {
    pub const ALL: [UserStatus; 3] = [Self::Active, Self::Inactive, Self::Pending];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Pending => "pending",
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown status '{}', expected one of: active, inactive, pending",
            self.0
        )
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for UserStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Pure user model for inter-module communication (no serde).
///
/// `password_hash` holds an Argon2 PHC string; `salt` is the per-user salt it was
/// derived with. Neither ever leaves the process through the REST layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
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
    /// Empty for self-registration.
    pub created_by: String,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Data for creating a new user. `password` is plaintext and hashed by the service.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CreateUserCommand {
    pub uuid: Option<Uuid>,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub login_name: String,
    pub password: String,
    pub email: String,
    pub status: Option<UserStatus>,
}

/// Profile edit. Only the name fields are mutable through this path.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpdateUserCommand {
    pub id: i64,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateStatusCommand {
    pub id: i64,
    pub status: UserStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePasswordCommand {
    pub id: i64,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForgotPasswordCommand {
    pub email: String,
}

/// Answer to a forgot-password request: accepted, but nothing is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForgotPasswordAck {
    pub accepted: bool,
    pub delivered: bool,
}

/// Paged search. Non-positive `page`/`per_page` fall back to configured defaults.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchUserQuery {
    pub page: i64,
    pub per_page: i64,
    /// Substring match.
    pub login_name: Option<String>,
    /// Substring match.
    pub email: Option<String>,
    pub status: Option<UserStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchUserResult {
    pub users: Vec<User>,
    pub page: i64,
    pub per_page: i64,
    /// Rows matching the filters, across all pages.
    pub total: u64,
}
