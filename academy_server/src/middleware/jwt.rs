//! Authentication middleware.
//!
//! Looks for an access token in the `Authorization: Bearer` header first and then in the [`AUTH_COOKIE`] cookie. A
//! valid token's claims are stored in the request extensions, where [`crate::middleware::AclMiddlewareFactory`] and
//! the [`JwtClaims`] extractor pick them up. Requests without a valid token are rejected with 401.
use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error,
    HttpMessage,
};
use futures::future::LocalBoxFuture;
use log::*;

use crate::{
    auth::{JwtClaims, TokenIssuer, AUTH_COOKIE},
    errors::{AuthError, ServerError},
};

pub struct JwtAuthMiddlewareFactory {
    issuer: Rc<TokenIssuer>,
}

impl JwtAuthMiddlewareFactory {
    pub fn new(issuer: TokenIssuer) -> Self {
        Self { issuer: Rc::new(issuer) }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuthMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = JwtAuthMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthMiddlewareService { issuer: Rc::clone(&self.issuer), service: Rc::new(service) }))
    }
}

pub struct JwtAuthMiddlewareService<S> {
    issuer: Rc<TokenIssuer>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let issuer = Rc::clone(&self.issuer);
        Box::pin(async move {
            let token = bearer_token(&req).or_else(|| req.cookie(AUTH_COOKIE).map(|c| c.value().to_string()));
            let Some(token) = token.filter(|t| !t.is_empty()) else {
                debug!("🔐️ No access token in request to {}", req.path());
                return Err(ServerError::AuthenticationError(AuthError::MissingToken).into());
            };
            let claims: JwtClaims = issuer.validate_token(&token).map_err(|e| {
                debug!("🔐️ Rejected access token for {}. {e}", req.path());
                Error::from(ServerError::AuthenticationError(e))
            })?;
            req.extensions_mut().insert(claims);
            service.call(req).await
        })
    }
}

fn bearer_token(req: &ServiceRequest) -> Option<String> {
    let value = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then(|| token.trim().to_string())
}
