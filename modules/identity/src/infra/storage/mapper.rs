use crate::contract::model::{User, UserStatus};
use crate::infra::storage::entity::{Model as UserEntity, StatusDb};

impl From<UserStatus> for StatusDb {
    fn from(s: UserStatus) -> Self {
        match s {
            UserStatus::Active => StatusDb::Active,
            UserStatus::Inactive => StatusDb::Inactive,
            UserStatus::Pending => StatusDb::Pending,
        }
    }
}

impl From<StatusDb> for UserStatus {
    fn from(s: StatusDb) -> Self {
        match s {
            StatusDb::Active => UserStatus::Active,
            StatusDb::Inactive => UserStatus::Inactive,
            StatusDb::Pending => UserStatus::Pending,
        }
    }
}

impl From<UserEntity> for User {
    fn from(e: UserEntity) -> Self {
        User {
            id: e.id,
            uuid: e.uuid,
            first_name: e.first_name,
            middle_name: e.middle_name,
            last_name: e.last_name,
            login_name: e.login_name,
            password_hash: e.password,
            salt: e.salt,
            email: e.email,
            status: e.status.into(),
            created_at: e.created_at,
            created_by: e.created_by,
            updated_at: e.updated_at,
        }
    }
}
