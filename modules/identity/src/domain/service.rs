use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use validator::ValidateEmail;

use crate::contract::model::{
    CreateUserCommand, ForgotPasswordAck, ForgotPasswordCommand, SearchUserQuery,
    SearchUserResult, UpdatePasswordCommand, UpdateStatusCommand, UpdateUserCommand, User,
};
use crate::domain::error::DomainError;
use crate::domain::password::hash_password;
use crate::domain::repo::{
    NewUserRecord, PasswordUpdate, StatusUpdate, UserNamesUpdate, UsersRepository,
};

/// Domain service with business rules for user administration.
/// Depends only on the repository port, not on infra types.
#[derive(Clone)]
pub struct Service {
    repo: Arc<dyn UsersRepository>,
    config: ServiceConfig,
}

/// Configuration for the domain service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub default_page: i64,
    pub default_per_page: i64,
    pub max_per_page: i64,
    pub max_name_length: usize,
    pub max_login_length: usize,
    pub min_password_length: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_per_page: 20,
            max_per_page: 100,
            max_name_length: 100,
            max_login_length: 64,
            min_password_length: 8,
        }
    }
}

impl Service {
    /// Create a service with dependencies.
    pub fn new(repo: Arc<dyn UsersRepository>, config: ServiceConfig) -> Self {
        Self { repo, config }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    #[instrument(
        name = "identity.user.service.create",
        skip(self, cmd),
        fields(login_name = %cmd.login_name)
    )]
    pub async fn create(&self, cmd: CreateUserCommand) -> Result<i64, DomainError> {
        info!("Creating new user");

        self.validate_create(&cmd)?;

        if self.repo.is_user_taken(&cmd.login_name).await? {
            return Err(DomainError::login_already_exists(cmd.login_name));
        }

        let credential = hash_password(&cmd.password)?;
        let rec = NewUserRecord {
            uuid: cmd.uuid.unwrap_or_else(Uuid::new_v4),
            first_name: cmd.first_name,
            middle_name: cmd.middle_name,
            last_name: cmd.last_name,
            login_name: cmd.login_name,
            password_hash: credential.hash,
            salt: credential.salt,
            email: cmd.email,
            status: cmd.status.unwrap_or_default(),
            created_at: Utc::now(),
            // Filled from the authenticated caller once requests carry one.
            created_by: String::new(),
        };

        let login_name = rec.login_name.clone();
        let id = self
            .repo
            .create(rec)
            .await
            .map_err(|e| DomainError::from_store(e, Some(&login_name)))?;

        info!(user_id = id, "Successfully created user");
        Ok(id)
    }

    #[instrument(
        name = "identity.user.service.search",
        skip(self, query),
        fields(page = query.page, per_page = query.per_page)
    )]
    pub async fn search(
        &self,
        mut query: SearchUserQuery,
    ) -> Result<SearchUserResult, DomainError> {
        let (page, per_page) = self.resolve_paging(query.page, query.per_page);
        query.page = page;
        query.per_page = per_page;
        debug!(page, per_page, "Searching users");

        let mut result = self.repo.search(&query).await?;
        result.page = page;
        result.per_page = per_page;

        debug!(
            returned = result.users.len(),
            total = result.total,
            "Search finished"
        );
        Ok(result)
    }

    #[instrument(name = "identity.user.service.get_by_id", skip(self), fields(user_id = id))]
    pub async fn get_by_id(&self, id: i64) -> Result<User, DomainError> {
        debug!("Getting user by id");
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| DomainError::user_not_found(id))
    }

    #[instrument(
        name = "identity.user.service.get_by_login",
        skip(self),
        fields(login_name = %login_name)
    )]
    pub async fn get_by_login(&self, login_name: &str) -> Result<User, DomainError> {
        debug!("Getting user by login");
        self.repo
            .get_by_login(login_name)
            .await?
            .ok_or_else(|| DomainError::login_not_found(login_name))
    }

    #[instrument(name = "identity.user.service.update", skip(self, cmd), fields(user_id = cmd.id))]
    pub async fn update(&self, cmd: UpdateUserCommand) -> Result<(), DomainError> {
        info!("Updating user names");

        self.validate_names(&cmd.first_name, &cmd.middle_name, &cmd.last_name)?;
        self.get_by_id(cmd.id).await?;

        self.repo
            .update(UserNamesUpdate {
                id: cmd.id,
                first_name: cmd.first_name,
                middle_name: cmd.middle_name,
                last_name: cmd.last_name,
                updated_at: Utc::now(),
            })
            .await?;

        info!("Successfully updated user");
        Ok(())
    }

    #[instrument(
        name = "identity.user.service.update_status",
        skip(self, cmd),
        fields(user_id = cmd.id, status = %cmd.status)
    )]
    pub async fn update_status(&self, cmd: UpdateStatusCommand) -> Result<(), DomainError> {
        info!("Updating user status");

        let current = self.get_by_id(cmd.id).await?;
        if current.status != cmd.status {
            debug!(from = %current.status, to = %cmd.status, "Status transition");
        }

        self.repo
            .update_status(StatusUpdate {
                id: current.id,
                status: cmd.status,
                updated_at: Utc::now(),
            })
            .await?;

        info!("Successfully updated status");
        Ok(())
    }

    #[instrument(
        name = "identity.user.service.update_password",
        skip(self, cmd),
        fields(user_id = cmd.id)
    )]
    pub async fn update_password(&self, cmd: UpdatePasswordCommand) -> Result<(), DomainError> {
        info!("Updating user password");

        self.validate_password(&cmd.password)?;
        // An unknown id surfaces as UserNotFound before anything is hashed.
        let current = self.get_by_id(cmd.id).await?;

        let credential = hash_password(&cmd.password)?;
        self.repo
            .update_password(PasswordUpdate {
                id: current.id,
                password_hash: credential.hash,
                salt: credential.salt,
                updated_at: Utc::now(),
            })
            .await?;

        info!("Successfully updated password");
        Ok(())
    }

    /// Accepted but not delivered: no reset token flow exists yet.
    #[instrument(name = "identity.user.service.forgot_password", skip(self, cmd))]
    pub async fn forgot_password(
        &self,
        cmd: ForgotPasswordCommand,
    ) -> Result<ForgotPasswordAck, DomainError> {
        self.validate_email(&cmd.email)?;
        warn!("Forgot-password requested but no reset delivery is configured");
        Ok(ForgotPasswordAck {
            accepted: true,
            delivered: false,
        })
    }

    /// Apply configured defaults to non-positive values and clamp the page size.
    pub fn resolve_paging(&self, page: i64, per_page: i64) -> (i64, i64) {
        let page = if page <= 0 {
            self.config.default_page
        } else {
            page
        };
        let per_page = if per_page <= 0 {
            self.config.default_per_page
        } else {
            per_page
        };
        (page, per_page.min(self.config.max_per_page))
    }

    fn validate_create(&self, cmd: &CreateUserCommand) -> Result<(), DomainError> {
        self.validate_login(&cmd.login_name)?;
        self.validate_password(&cmd.password)?;
        self.validate_email(&cmd.email)?;
        self.validate_names(&cmd.first_name, &cmd.middle_name, &cmd.last_name)
    }

    fn validate_login(&self, login_name: &str) -> Result<(), DomainError> {
        if login_name.trim().is_empty() {
            return Err(DomainError::validation("loginName", "must not be empty"));
        }
        if login_name.chars().any(char::is_whitespace) {
            return Err(DomainError::validation(
                "loginName",
                "must not contain whitespace",
            ));
        }
        if login_name.chars().count() > self.config.max_login_length {
            return Err(DomainError::validation(
                "loginName",
                format!("must be at most {} characters", self.config.max_login_length),
            ));
        }
        Ok(())
    }

    fn validate_password(&self, password: &str) -> Result<(), DomainError> {
        if password.chars().count() < self.config.min_password_length {
            return Err(DomainError::validation(
                "password",
                format!(
                    "must be at least {} characters",
                    self.config.min_password_length
                ),
            ));
        }
        Ok(())
    }

    fn validate_email(&self, email: &str) -> Result<(), DomainError> {
        if !email.validate_email() {
            return Err(DomainError::validation("email", "must be a valid email address"));
        }
        Ok(())
    }

    fn validate_names(&self, first: &str, middle: &str, last: &str) -> Result<(), DomainError> {
        for (field, value, required) in [
            ("firstName", first, true),
            ("middleName", middle, false),
            ("lastName", last, true),
        ] {
            if required && value.trim().is_empty() {
                return Err(DomainError::validation(field, "must not be empty"));
            }
            if value.chars().count() > self.config.max_name_length {
                return Err(DomainError::validation(
                    field,
                    format!("must be at most {} characters", self.config.max_name_length),
                ));
            }
        }
        Ok(())
    }
}
