use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::contract::model::{
    CreateUserCommand, ForgotPasswordAck, SearchUserResult, User, UserStatus,
};

/// REST representation of a user. Credentials are never serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: i64,
    pub uuid: Uuid,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub login_name: String,
    pub email: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserReq {
    #[serde(default)]
    pub uuid: Option<Uuid>,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub first_name: String,
    #[serde(default)]
    pub middle_name: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub last_name: String,
    #[validate(length(min = 1, max = 64, message = "must be 1 to 64 characters"))]
    pub login_name: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub password: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[serde(default)]
    #[validate(custom(function = "validate_status"))]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserReq {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub first_name: String,
    #[serde(default)]
    pub middle_name: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub last_name: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateStatusReq {
    #[validate(custom(function = "validate_status"))]
    pub status: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdatePasswordReq {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ForgotPasswordReq {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginReq {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub login_name: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub password: String,
}

/// Query string for `GET /api/user/`. Absent or non-positive paging uses defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchUsersParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub login_name: Option<String>,
    pub email: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListDto {
    pub users: Vec<UserDto>,
    pub page: i64,
    pub per_page: i64,
    pub total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgotPasswordDto {
    pub accepted: bool,
    pub delivered: bool,
}

fn validate_status(status: &str) -> Result<(), validator::ValidationError> {
    status.parse::<UserStatus>().map(|_| ()).map_err(|e| {
        let mut err = validator::ValidationError::new("status");
        err.message = Some(e.to_string().into());
        err
    })
}

// Conversion implementations between REST DTOs and contract models

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            uuid: user.uuid,
            first_name: user.first_name,
            middle_name: user.middle_name,
            last_name: user.last_name,
            login_name: user.login_name,
            email: user.email,
            status: user.status.to_string(),
            created_at: user.created_at,
            created_by: user.created_by,
            updated_at: user.updated_at,
        }
    }
}

impl From<SearchUserResult> for UserListDto {
    fn from(res: SearchUserResult) -> Self {
        Self {
            users: res.users.into_iter().map(UserDto::from).collect(),
            page: res.page,
            per_page: res.per_page,
            total: res.total,
        }
    }
}

impl From<ForgotPasswordAck> for ForgotPasswordDto {
    fn from(ack: ForgotPasswordAck) -> Self {
        Self {
            accepted: ack.accepted,
            delivered: ack.delivered,
        }
    }
}

/// Call only after `validate()`; an unparsable status is dropped.
impl From<CreateUserReq> for CreateUserCommand {
    fn from(req: CreateUserReq) -> Self {
        Self {
            uuid: req.uuid,
            first_name: req.first_name,
            middle_name: req.middle_name,
            last_name: req.last_name,
            login_name: req.login_name,
            password: req.password,
            email: req.email,
            status: req.status.and_then(|s| s.parse().ok()),
        }
    }
}
