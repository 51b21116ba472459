//! Registration, credential checks and e-mail verification.
use std::fmt::Debug;

use chrono::Utc;
use log::*;

use crate::{
    db_types::{NewUser, Role, User},
    helpers::{
        generate_registration_number,
        hash_password,
        new_verification_token,
        verify_password,
        DEFAULT_URN_ATTEMPTS,
    },
    traits::{IdentifierError, IdentifierLookup, UserApiError, UserManagement},
};

pub const MIN_PASSWORD_LENGTH: usize = 8;
const URN_INSERT_ATTEMPTS: usize = 3;

impl From<IdentifierError> for UserApiError {
    fn from(e: IdentifierError) -> Self {
        match e {
            IdentifierError::InvalidInput(s) => UserApiError::InvalidInput(s),
            IdentifierError::DatabaseError(s) => UserApiError::DatabaseError(s),
        }
    }
}

pub struct UserApi<B> {
    db: B,
}

impl<B: Debug> Debug for UserApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UserApi ({:?})", self.db)
    }
}

impl<B> UserApi<B>
where B: UserManagement + IdentifierLookup
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Self-service sign up. New accounts are always students.
    pub async fn register(&self, email: &str, name: &str, password: &str) -> Result<User, UserApiError> {
        self.create_user(email, name, password, Role::Student).await
    }

    /// Creates an account with any role. Only administrators should be able to reach this.
    pub async fn create_staff(&self, email: &str, name: &str, password: &str, role: Role) -> Result<User, UserApiError> {
        self.create_user(email, name, password, role).await
    }

    async fn create_user(&self, email: &str, name: &str, password: &str, role: Role) -> Result<User, UserApiError> {
        let email = normalize_email(email)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(UserApiError::InvalidInput("name is required".into()));
        }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(UserApiError::InvalidInput(format!(
                "Passwords must be at least {MIN_PASSWORD_LENGTH} characters long"
            )));
        }
        let password_hash = hash_password(password)?;
        let mut attempt = 1;
        loop {
            let registration_number =
                generate_registration_number(&self.db, role.category(), DEFAULT_URN_ATTEMPTS).await?;
            let user = NewUser {
                email: email.clone(),
                name: name.to_string(),
                role,
                registration_number,
                password_hash: password_hash.clone(),
            };
            match self.db.insert_user(user).await {
                Ok(user) => {
                    info!("🔐️ New {} account #{} for {} ({})", user.role, user.id, user.email, user.registration_number);
                    return Ok(user);
                },
                Err(UserApiError::RegistrationNumberTaken(urn)) if attempt < URN_INSERT_ATTEMPTS => {
                    debug!("🔐️ Registration number {urn} was claimed concurrently. Retrying.");
                    attempt += 1;
                },
                Err(e) => return Err(e),
            }
        }
    }

    /// Checks the credentials. Unknown e-mail addresses and wrong passwords produce the same error.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, UserApiError> {
        let email = email.trim().to_lowercase();
        let Some(user) = self.db.fetch_user_by_email(&email).await? else {
            debug!("🔐️ Login attempt for unknown account {email}");
            return Err(UserApiError::InvalidCredentials);
        };
        if verify_password(password, &user.password_hash)? {
            Ok(user)
        } else {
            debug!("🔐️ Wrong password for account #{}", user.id);
            Err(UserApiError::InvalidCredentials)
        }
    }

    /// Issues a single-use e-mail verification token. Delivery is handled elsewhere; the token is logged so that it
    /// can be retrieved in development.
    pub async fn issue_verification_token(&self, user_id: i64) -> Result<String, UserApiError> {
        let user = self.fetch_user(user_id).await?;
        let (token, expires_at) = new_verification_token(Utc::now());
        self.db.insert_verification_token(user.id, &token, expires_at).await?;
        info!("🔐️ E-mail verification token for {}: {token} (expires {expires_at})", user.email);
        Ok(token)
    }

    pub async fn verify_email(&self, token: &str) -> Result<User, UserApiError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(UserApiError::TokenInvalid);
        }
        let user = self.db.consume_verification_token(token, Utc::now()).await?;
        info!("🔐️ E-mail address {} verified", user.email);
        Ok(user)
    }

    pub async fn fetch_user(&self, id: i64) -> Result<User, UserApiError> {
        self.db.fetch_user(id).await?.ok_or(UserApiError::UserNotFound(id))
    }
}

fn normalize_email(email: &str) -> Result<String, UserApiError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((user, domain)) if !user.is_empty() && domain.contains('.') && !domain.ends_with('.') => Ok(email),
        _ => Err(UserApiError::InvalidInput(format!("'{email}' is not a valid e-mail address"))),
    }
}
