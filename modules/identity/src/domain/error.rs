use thiserror::Error;

/// Failures reported by the user store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    Conflict(String),

    #[error("no user row with id {id}")]
    Missing { id: i64 },

    #[error("storage operation canceled")]
    Canceled,

    #[error("storage failure: {0}")]
    Storage(String),
}

/// Domain-specific errors using thiserror
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("user with login name {login_name} already exists")]
    LoginAlreadyExists { login_name: String },

    #[error("user with id {id} not found")]
    UserNotFound { id: i64 },

    #[error("user with login name {login_name} not found")]
    LoginNotFound { login_name: String },

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("operation canceled")]
    Canceled,

    #[error("Password hashing failed: {message}")]
    PasswordHash { message: String },

    #[error("Database error: {message}")]
    Database { message: String },
}

impl DomainError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn login_already_exists(login_name: impl Into<String>) -> Self {
        Self::LoginAlreadyExists {
            login_name: login_name.into(),
        }
    }

    pub fn user_not_found(id: i64) -> Self {
        Self::UserNotFound { id }
    }

    pub fn login_not_found(login_name: impl Into<String>) -> Self {
        Self::LoginNotFound {
            login_name: login_name.into(),
        }
    }

    pub fn password_hash(message: impl Into<String>) -> Self {
        Self::PasswordHash {
            message: message.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    /// Translate a store failure. The caller supplies the login for conflicts.
    pub fn from_store(err: StoreError, login_name: Option<&str>) -> Self {
        match err {
            StoreError::Conflict(detail) => match login_name {
                Some(login) => Self::login_already_exists(login),
                None => Self::database(detail),
            },
            StoreError::Missing { id } => Self::user_not_found(id),
            StoreError::Canceled => Self::Canceled,
            StoreError::Storage(message) => Self::database(message),
        }
    }
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        Self::from_store(err, None)
    }
}
