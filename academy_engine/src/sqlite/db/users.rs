use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{EmailVerificationToken, NewUser, User},
    traits::UserApiError,
};

pub async fn registration_number_exists(urn: &str, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE registration_number = $1)")
        .bind(urn)
        .fetch_one(conn)
        .await
}

pub async fn insert_user(user: NewUser, conn: &mut SqliteConnection) -> Result<User, UserApiError> {
    let urn = user.registration_number.clone();
    let result: Result<User, sqlx::Error> = sqlx::query_as(
        r#"
            INSERT INTO users (email, name, role, registration_number, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(user.email)
    .bind(user.name)
    .bind(user.role)
    .bind(user.registration_number)
    .bind(user.password_hash)
    .fetch_one(conn)
    .await;
    match result {
        Ok(user) => {
            debug!("🗃️ User #{} ({}) created with registration number {}", user.id, user.role, user.registration_number);
            Ok(user)
        },
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            if e.message().contains("registration_number") {
                Err(UserApiError::RegistrationNumberTaken(urn))
            } else {
                Err(UserApiError::EmailTaken)
            }
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_user(id: i64, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_user_by_email(email: &str, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE email = $1").bind(email).fetch_optional(conn).await
}

pub async fn insert_verification_token(
    user_id: i64,
    token: &str,
    expires_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO email_verification_tokens (token, user_id, expires_at) VALUES ($1, $2, $3)")
        .bind(token)
        .bind(user_id)
        .bind(expires_at)
        .execute(conn)
        .await?;
    Ok(())
}

/// Marks the token used and the user verified. Call it with a transaction.
pub async fn consume_verification_token(
    token: &str,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<User, UserApiError> {
    let record: EmailVerificationToken = sqlx::query_as("SELECT * FROM email_verification_tokens WHERE token = $1")
        .bind(token)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(UserApiError::TokenInvalid)?;
    if record.used_at.is_some() {
        return Err(UserApiError::TokenInvalid);
    }
    if record.expires_at <= now {
        return Err(UserApiError::TokenExpired);
    }
    sqlx::query("UPDATE email_verification_tokens SET used_at = $1 WHERE token = $2")
        .bind(now)
        .bind(token)
        .execute(&mut *conn)
        .await?;
    let user: Option<User> = sqlx::query_as(
        "UPDATE users SET email_verified = 1, updated_at = CURRENT_TIMESTAMP WHERE id = $1 RETURNING *",
    )
    .bind(record.user_id)
    .fetch_optional(conn)
    .await?;
    let user = user.ok_or(UserApiError::UserNotFound(record.user_id))?;
    debug!("🗃️ E-mail address for user #{} verified", user.id);
    Ok(user)
}
