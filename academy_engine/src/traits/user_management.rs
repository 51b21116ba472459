use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db_types::{NewUser, User};

#[derive(Debug, Clone, Error)]
pub enum UserApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("An account with this e-mail address already exists")]
    EmailTaken,
    #[error("Registration number {0} is already in use")]
    RegistrationNumberTaken(String),
    #[error("User {0} does not exist")]
    UserNotFound(i64),
    #[error("Invalid e-mail address or password")]
    InvalidCredentials,
    #[error("The verification token is invalid or has already been used")]
    TokenInvalid,
    #[error("The verification token has expired")]
    TokenExpired,
    #[error("Invalid request: {0}")]
    InvalidInput(String),
    #[error("Could not process password: {0}")]
    PasswordHashError(String),
}

impl From<sqlx::Error> for UserApiError {
    fn from(e: sqlx::Error) -> Self {
        UserApiError::DatabaseError(e.to_string())
    }
}

#[allow(async_fn_in_trait)]
pub trait UserManagement {
    /// Stores a new user. Unique collisions are reported as [`UserApiError::EmailTaken`] or
    /// [`UserApiError::RegistrationNumberTaken`].
    async fn insert_user(&self, user: NewUser) -> Result<User, UserApiError>;

    async fn fetch_user(&self, id: i64) -> Result<Option<User>, UserApiError>;

    async fn fetch_user_by_email(&self, email: &str) -> Result<Option<User>, UserApiError>;

    async fn insert_verification_token(
        &self,
        user_id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), UserApiError>;

    /// Atomically marks the token used and the owning user verified. Unknown or previously used tokens yield
    /// [`UserApiError::TokenInvalid`], and tokens past `expires_at` yield [`UserApiError::TokenExpired`].
    async fn consume_verification_token(&self, token: &str, now: DateTime<Utc>) -> Result<User, UserApiError>;
}
