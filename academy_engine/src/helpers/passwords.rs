use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::traits::UserApiError;

/// Hashes a password with Argon2id and a random salt, returning the PHC string.
pub fn hash_password(password: &str) -> Result<String, UserApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| UserApiError::PasswordHashError(e.to_string()))
}

/// `Ok(false)` for a wrong password. Errors are reserved for hashes that cannot be parsed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, UserApiError> {
    let parsed = PasswordHash::new(hash).map_err(|e| UserApiError::PasswordHashError(e.to_string()))?;
    Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}
