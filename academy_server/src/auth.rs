//! Access tokens.
//!
//! After a successful login the server issues an HS256-signed JWT. The token is sent back in an HttpOnly cookie named
//! [`AUTH_COOKIE`] and in the response body, so that both browsers and API clients can use it. Either form is accepted
//! on subsequent requests (see [`crate::middleware::JwtAuthMiddlewareFactory`]).
use std::future::{ready, Ready};

use academy_engine::db_types::{Role, User};
use actix_web::{
    cookie::{time::Duration as CookieDuration, Cookie, SameSite},
    dev::Payload,
    FromRequest,
    HttpMessage,
    HttpRequest,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

pub const AUTH_COOKIE: &str = "academy_token";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The user id.
    pub sub: i64,
    pub email: String,
    pub role: Role,
    /// Expiry, in seconds since the Unix epoch.
    pub exp: i64,
}

impl JwtClaims {
    pub fn for_user(user: &User, ttl: Duration) -> Self {
        let exp = (Utc::now() + ttl).timestamp();
        Self { sub: user.id, email: user.email.clone(), role: user.role, exp }
    }
}

/// Handlers behind the authentication middleware can take `JwtClaims` as an argument.
impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let claims = req.extensions().get::<JwtClaims>().cloned().ok_or_else(|| {
            warn!("🔐️ No JWT claims found in request extensions. Is the route missing the auth middleware?");
            ServerError::AuthenticationError(AuthError::MissingToken)
        });
        ready(claims)
    }
}

#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.reveal().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl: config.token_ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a new access token for the given user.
    /// This method DOES NOT check the user's credentials. That must be done prior to calling `issue_token`.
    pub fn issue_token(&self, user: &User) -> Result<String, ServerError> {
        let claims = JwtClaims::for_user(user, self.ttl);
        self.sign(&claims)
    }

    pub fn sign(&self, claims: &JwtClaims) -> Result<String, ServerError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| ServerError::CouldNotIssueAccessToken(e.to_string()))
    }

    pub fn validate_token(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let data = decode::<JwtClaims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            use jsonwebtoken::errors::ErrorKind;
            match e.kind() {
                ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
                    AuthError::PoorlyFormattedToken(e.to_string())
                },
                _ => AuthError::ValidationError(e.to_string()),
            }
        })?;
        trace!("🔐️ Token for user #{} validated", data.claims.sub);
        Ok(data.claims)
    }
}

/// The cookie that carries the access token.
pub fn auth_cookie(token: String, ttl: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build(AUTH_COOKIE, token)
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::seconds(ttl.num_seconds()))
        .finish()
}

/// An expired, empty cookie that makes the browser forget the access token.
pub fn removal_cookie(secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::build(AUTH_COOKIE, "").path("/").http_only(true).secure(secure).finish();
    cookie.make_removal();
    cookie
}
