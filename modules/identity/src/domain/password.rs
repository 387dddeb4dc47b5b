//! Argon2id credential hashing with a per-user random salt.

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;

use crate::domain::error::DomainError;

/// A freshly derived credential: the PHC hash string and the salt it embeds.
#[derive(Debug, Clone)]
pub struct Credential {
    pub hash: String,
    pub salt: String,
}

pub fn hash_password(password: &str) -> Result<Credential, DomainError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DomainError::password_hash(e.to_string()))?
        .to_string();
    Ok(Credential {
        hash,
        salt: salt.as_str().to_string(),
    })
}

/// A stored hash that does not parse is treated as a mismatch.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        tracing::warn!("stored password hash is not a valid PHC string");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
