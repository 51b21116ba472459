use academy_engine::db_types::{
    CatalogItem,
    CourseType,
    Enrollment,
    EnrollmentStatus,
    MinorUnits,
    PaymentSession,
    PaymentStatus,
    Role,
    User,
};
use actix_web::{
    body::{to_bytes, MessageBody},
    http::StatusCode,
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use chrono::{TimeZone, Utc};
use log::debug;
use serde_json::{json, Value};

use crate::{
    auth::{JwtClaims, TokenIssuer, AUTH_COOKIE},
    config::{AuthConfig, ServerOptions},
    server::json_config,
};

// DO NOT re-use this secret anywhere.
pub const TEST_JWT_SECRET: &str = "7f1c0e3a9b2d4f6e8a0c2e4f6a8b0d2e";

pub fn issuer() -> TokenIssuer {
    TokenIssuer::new(&AuthConfig::new(TEST_JWT_SECRET))
}

pub fn issue_token(id: i64, email: &str, role: Role) -> String {
    let claims = JwtClaims { sub: id, email: email.to_string(), role, exp: Utc::now().timestamp() + 3600 };
    issuer().sign(&claims).unwrap()
}

/// How the access token is attached to the request.
#[derive(Clone, Copy)]
pub enum Credentials<'a> {
    None,
    Bearer(&'a str),
    Cookie(&'a str),
}

pub async fn get_request(
    creds: Credentials<'_>,
    path: &str,
    configure: fn(&mut ServiceConfig),
) -> (StatusCode, String) {
    send(TestRequest::get().uri(path), creds, configure).await
}

pub async fn post_request(
    creds: Credentials<'_>,
    path: &str,
    body: Value,
    configure: fn(&mut ServiceConfig),
) -> (StatusCode, String) {
    send(TestRequest::post().uri(path).set_json(body), creds, configure).await
}

pub async fn patch_request(
    creds: Credentials<'_>,
    path: &str,
    body: Value,
    configure: fn(&mut ServiceConfig),
) -> (StatusCode, String) {
    send(TestRequest::patch().uri(path).set_json(body), creds, configure).await
}

pub async fn send(
    req: TestRequest,
    creds: Credentials<'_>,
    configure: fn(&mut ServiceConfig),
) -> (StatusCode, String) {
    let req = match creds {
        Credentials::None => req,
        Credentials::Bearer(token) => req.insert_header(("Authorization", format!("Bearer {token}"))),
        Credentials::Cookie(token) => req.cookie(actix_web::cookie::Cookie::new(AUTH_COOKIE, token.to_string())),
    };
    let app = App::new()
        .app_data(json_config())
        .app_data(web::Data::new(issuer()))
        .app_data(web::Data::new(ServerOptions::default()))
        .configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            (status, body_text(res.into_body()).await)
        },
        // Middleware errors surface as service errors rather than responses
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            (status, body_text(res.into_body()).await)
        },
    }
}

async fn body_text<B: MessageBody>(body: B) -> String {
    match to_bytes(body).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => String::new(),
    }
}

pub fn timestamp() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 10, 1, 9, 30, 0).unwrap()
}

pub fn enrollment(id: i64, status: EnrollmentStatus) -> Enrollment {
    serde_json::from_value(json!({
        "id": id,
        "userEmail": "a@b.com",
        "courseType": CourseType::SkillPath,
        "courseSlug": "frontend-101",
        "status": status,
        "amount": 4999.0,
        "currency": "INR",
        "meta": {},
        "createdAt": timestamp(),
        "updatedAt": timestamp(),
    }))
    .unwrap()
}

pub fn session(id: i64, enrollment_id: i64, status: PaymentStatus, order_id: Option<&str>) -> PaymentSession {
    PaymentSession {
        id,
        enrollment_id: Some(enrollment_id),
        amount: MinorUnits::from(499900),
        currency: "INR".to_string(),
        gateway_order_id: order_id.map(String::from),
        gateway_payment_id: None,
        gateway_signature: None,
        status,
        failure_reason: None,
        created_at: timestamp(),
        updated_at: timestamp(),
    }
}

pub fn user(id: i64, email: &str, role: Role, password_hash: &str) -> User {
    User {
        id,
        email: email.to_string(),
        name: "Ada Lovelace".to_string(),
        role,
        registration_number: "STD/2024/00042".to_string(),
        password_hash: password_hash.to_string(),
        email_verified: true,
        created_at: timestamp(),
        updated_at: timestamp(),
    }
}

pub fn catalog_item(id: i64, kind: CourseType, title: &str, slug: &str) -> CatalogItem {
    CatalogItem {
        id,
        kind,
        title: title.to_string(),
        slug: slug.to_string(),
        description: None,
        price: Some(4999.0),
        currency: "INR".to_string(),
        published: true,
        created_at: timestamp(),
        updated_at: timestamp(),
    }
}
