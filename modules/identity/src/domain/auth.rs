//! Credential verification capability.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::contract::model::{User, UserStatus};
use crate::domain::error::DomainError;
use crate::domain::password::verify_password;
use crate::domain::service::Service;

/// Verifies a login/password pair and yields the matching user.
#[async_trait]
pub trait AuthService: Send + Sync {
    async fn authenticate(&self, login_name: &str, password: &str) -> Result<User, DomainError>;
}

/// Checks the Argon2 hash stored for the login. Only `active` users may sign in.
///
/// Unknown login, wrong password and inactive account all collapse into
/// `InvalidCredentials` so callers cannot tell which logins exist.
pub struct PasswordAuthService {
    users: Arc<Service>,
}

impl PasswordAuthService {
    pub fn new(users: Arc<Service>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl AuthService for PasswordAuthService {
    #[instrument(
        name = "identity.auth.authenticate",
        skip(self, password),
        fields(login_name = %login_name)
    )]
    async fn authenticate(&self, login_name: &str, password: &str) -> Result<User, DomainError> {
        let user = match self.users.get_by_login(login_name).await {
            Ok(user) => user,
            Err(DomainError::LoginNotFound { .. }) => {
                debug!("unknown login");
                return Err(DomainError::InvalidCredentials);
            }
            Err(e) => return Err(e),
        };

        if !verify_password(password, &user.password_hash) {
            debug!(user_id = user.id, "password mismatch");
            return Err(DomainError::InvalidCredentials);
        }
        if user.status != UserStatus::Active {
            debug!(user_id = user.id, status = %user.status, "account not active");
            return Err(DomainError::InvalidCredentials);
        }
        Ok(user)
    }
}
