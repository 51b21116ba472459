use academy_engine::{
    db_types::{CourseType, Enrollment, EnrollmentStatus, PaymentStatus, Role},
    traits::EnrollmentError,
    EnrollmentApi,
};
use actix_web::{http::StatusCode, web, web::ServiceConfig};
use serde_json::{json, Value};

use super::{
    helpers::{enrollment, get_request, issue_token, issuer, patch_request, post_request, session, Credentials},
    mocks::MockCheckoutStore,
};
use crate::{
    middleware::JwtAuthMiddlewareFactory,
    routes::{CancelEnrollmentRoute, CreateEnrollmentRoute, EnrollmentPaymentsRoute, MyEnrollmentsRoute, SearchEnrollmentsRoute},
};

fn mount(cfg: &mut ServiceConfig, store: MockCheckoutStore) {
    let api = EnrollmentApi::new(store);
    let scope = web::scope("/api")
        .wrap(JwtAuthMiddlewareFactory::new(issuer()))
        .service(MyEnrollmentsRoute::<MockCheckoutStore>::new())
        .service(SearchEnrollmentsRoute::<MockCheckoutStore>::new())
        .service(CancelEnrollmentRoute::<MockCheckoutStore>::new())
        .service(EnrollmentPaymentsRoute::<MockCheckoutStore>::new());
    cfg.app_data(web::Data::new(api)).service(CreateEnrollmentRoute::<MockCheckoutStore>::new()).service(scope);
}

fn stored(id: i64, email: &str, course_type: CourseType, slug: &str, amount: Option<f64>) -> Enrollment {
    let mut e = enrollment(id, EnrollmentStatus::Pending);
    e.user_email = email.to_string();
    e.course_type = course_type;
    e.course_slug = slug.to_string();
    e.amount = amount;
    e
}

#[actix_web::test]
async fn create_enrollment() {
    let _ = env_logger::try_init().ok();
    let request = json!({
        "userEmail": "  Ada@Example.com ",
        "courseType": "careerpath",
        "courseSlug": "data-science",
        "amount": 12500.5,
        "meta": { "source": "landing-page" },
    });
    let (status, body) = post_request(Credentials::None, "/enrollments", request, |cfg| {
        let mut store = MockCheckoutStore::new();
        store
            .expect_insert_enrollment()
            .withf(|e| e.user_email == "ada@example.com" && e.currency == "INR" && e.status == EnrollmentStatus::Pending)
            .times(1)
            .returning(|e| Ok(stored(12, &e.user_email, e.course_type, &e.course_slug, e.amount)));
        mount(cfg, store);
    })
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let enrollment: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(enrollment["id"], 12);
    assert_eq!(enrollment["userEmail"], "ada@example.com");
    assert_eq!(enrollment["courseType"], "careerpath");
    assert_eq!(enrollment["status"], "pending");
    assert_eq!(enrollment["amount"], 12500.5);
}

#[actix_web::test]
async fn duplicate_enrollment_is_a_conflict() {
    let _ = env_logger::try_init().ok();
    let request = json!({ "userEmail": "a@b.com", "courseType": "course", "courseSlug": "rust-101" });
    let (status, body) = post_request(Credentials::None, "/enrollments", request, |cfg| {
        let mut store = MockCheckoutStore::new();
        store.expect_insert_enrollment().returning(|e| {
            Err(EnrollmentError::AlreadyExists {
                email: e.user_email,
                course_type: e.course_type,
                course_slug: e.course_slug,
            })
        });
        mount(cfg, store);
    })
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, r#"{"error":"a@b.com is already enrolled in course 'rust-101'"}"#);
}

#[actix_web::test]
async fn malformed_enrollment_request() {
    let _ = env_logger::try_init().ok();
    let request = json!({ "userEmail": "a@b.com", "courseType": "webinar", "courseSlug": "rust-101" });
    let (status, body) = post_request(Credentials::None, "/enrollments", request, |cfg| {
        let mut store = MockCheckoutStore::new();
        store.expect_insert_enrollment().never();
        mount(cfg, store);
    })
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.starts_with(r#"{"error":"Could not read request body:"#), "{body}");
}

#[actix_web::test]
async fn invalid_email_is_rejected_before_storage() {
    let _ = env_logger::try_init().ok();
    let request = json!({ "userEmail": "not-an-email", "courseType": "course", "courseSlug": "rust-101" });
    let (status, body) = post_request(Credentials::None, "/enrollments", request, |cfg| {
        let mut store = MockCheckoutStore::new();
        store.expect_insert_enrollment().never();
        mount(cfg, store);
    })
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        r#"{"error":"Could not read request body: Invalid enrollment request: not-an-email is not a valid e-mail address"}"#
    );
}

#[actix_web::test]
async fn my_enrollments_uses_the_token_email() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(4, "ada@example.com", Role::Student);
    let (status, body) = get_request(Credentials::Cookie(&token), "/api/dashboard/enrollments", |cfg| {
        let mut store = MockCheckoutStore::new();
        store
            .expect_fetch_enrollments_for_user()
            .times(1)
            .returning(|email| Ok(vec![stored(3, email, CourseType::Course, "rust-101", Some(999.0))]));
        mount(cfg, store);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    let enrollments: Vec<Value> = serde_json::from_str(&body).unwrap();
    assert_eq!(enrollments.len(), 1);
    assert_eq!(enrollments[0]["userEmail"], "ada@example.com");
    assert_eq!(enrollments[0]["courseSlug"], "rust-101");
}

#[actix_web::test]
async fn admin_search_passes_the_filter() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(1, "admin@example.com", Role::Admin);
    let path = "/api/admin/enrollments?status=pending&course_type=skillpath";
    let (status, body) = get_request(Credentials::Bearer(&token), path, |cfg| {
        let mut store = MockCheckoutStore::new();
        store
            .expect_search_enrollments()
            .withf(|q| {
                q.status == Some(EnrollmentStatus::Pending) &&
                    q.course_type == Some(CourseType::SkillPath) &&
                    q.user_email.is_none()
            })
            .times(1)
            .returning(|_| Ok(vec![enrollment(1, EnrollmentStatus::Pending), enrollment(2, EnrollmentStatus::Pending)]));
        mount(cfg, store);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    let enrollments: Vec<Value> = serde_json::from_str(&body).unwrap();
    assert_eq!(enrollments.len(), 2);
}

#[actix_web::test]
async fn students_cannot_search_enrollments() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(4, "ada@example.com", Role::Student);
    let (status, body) = get_request(Credentials::Bearer(&token), "/api/admin/enrollments", |cfg| {
        let mut store = MockCheckoutStore::new();
        store.expect_search_enrollments().never();
        mount(cfg, store);
    })
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, r#"{"error":"Insufficient Permissions. This action requires one of [Admin]"}"#);
}

#[actix_web::test]
async fn cancel_enrollment() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(1, "admin@example.com", Role::Admin);
    let (status, body) = patch_request(Credentials::Bearer(&token), "/api/admin/enrollments/5/cancel", json!({}), |cfg| {
        let mut store = MockCheckoutStore::new();
        store.expect_cancel_enrollment().times(1).returning(|id| Ok(enrollment(id, EnrollmentStatus::Cancelled)));
        mount(cfg, store);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    let enrollment: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(enrollment["id"], 5);
    assert_eq!(enrollment["status"], "cancelled");
}

#[actix_web::test]
async fn paid_enrollments_cannot_be_cancelled() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(1, "admin@example.com", Role::Admin);
    let (status, body) = patch_request(Credentials::Bearer(&token), "/api/admin/enrollments/5/cancel", json!({}), |cfg| {
        let mut store = MockCheckoutStore::new();
        store.expect_cancel_enrollment().returning(|id| {
            Err(EnrollmentError::InvalidState { id, status: EnrollmentStatus::Paid, action: "cancelled" })
        });
        mount(cfg, store);
    })
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"Enrollment 5 is paid and cannot be cancelled"}"#);
}

#[actix_web::test]
async fn payment_history_for_an_enrollment() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(1, "admin@example.com", Role::Admin);
    let (status, body) = get_request(Credentials::Bearer(&token), "/api/admin/enrollments/7/payments", |cfg| {
        let mut store = MockCheckoutStore::new();
        store.expect_fetch_sessions_for_enrollment().returning(|id| {
            Ok(vec![session(1, id, PaymentStatus::Failed, None), session(2, id, PaymentStatus::Paid, Some("order_2"))])
        });
        mount(cfg, store);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    let sessions: Vec<Value> = serde_json::from_str(&body).unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[1]["status"], "paid");
    assert_eq!(sessions[1]["gatewayOrderId"], "order_2");
    assert_eq!(sessions[1]["amount"], 499900);
}
