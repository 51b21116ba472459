use academy_common::Secret;
use academy_engine::{
    db_types::{EnrollmentStatus, PaymentStatus},
    helpers::payment_signature,
    test_utils::fake_gateway::FakeGateway,
    traits::{EnrollmentError, GatewayError},
    CheckoutApi,
};
use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use serde_json::json;

use super::{
    helpers::{enrollment, post_request, send, session, Credentials},
    mocks::MockCheckoutStore,
};
use crate::{
    helpers::calculate_hmac,
    middleware::{HmacMiddlewareFactory, RAZORPAY_SIGNATURE_HEADER},
    routes::{CreateOrderRoute, PaymentWebhookRoute, VerifyPaymentRoute},
};

const KEY_SECRET: &str = "rzp_test_key_secret";
const WEBHOOK_SECRET: &str = "rzp_webhook_secret";

type Api = CheckoutApi<MockCheckoutStore, FakeGateway>;

fn mount(cfg: &mut ServiceConfig, store: MockCheckoutStore, gateway: FakeGateway) {
    let api: Api = CheckoutApi::new(store, gateway, Secret::new(KEY_SECRET.to_string()));
    let webhooks = web::scope("/payments/webhook")
        .wrap(HmacMiddlewareFactory::new(RAZORPAY_SIGNATURE_HEADER, Secret::new(WEBHOOK_SECRET.to_string()), true))
        .service(PaymentWebhookRoute::<MockCheckoutStore, FakeGateway>::new());
    cfg.app_data(web::Data::new(api))
        .service(CreateOrderRoute::<MockCheckoutStore, FakeGateway>::new())
        .service(VerifyPaymentRoute::<MockCheckoutStore, FakeGateway>::new())
        .service(webhooks);
}

//-------------------------------------------------   create-order   ---------------------------------------------------

#[actix_web::test]
async fn create_order_for_new_enrollment() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request(Credentials::None, "/payments/create-order", json!({"enrollmentId": 7}), |cfg| {
        let mut store = MockCheckoutStore::new();
        store.expect_fetch_enrollment().returning(|id| Ok(Some(enrollment(id, EnrollmentStatus::Pending))));
        store.expect_fetch_active_session().times(1).returning(|_| Ok(None));
        store.expect_insert_session().times(1).returning(|s| Ok(session(7, s.enrollment_id, PaymentStatus::Created, None)));
        store
            .expect_attach_gateway_order()
            .times(1)
            .returning(|id, order_id| Ok(session(id, 7, PaymentStatus::Created, Some(order_id))));
        mount(cfg, store, FakeGateway::default());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"orderId":"order_1","amount":499900,"currency":"INR","key":"rzp_test_key","paymentId":7}"#);
}

#[actix_web::test]
async fn create_order_reuses_the_live_order() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request(Credentials::None, "/payments/create-order", json!({"enrollmentId": 7}), |cfg| {
        let mut store = MockCheckoutStore::new();
        store.expect_fetch_enrollment().returning(|id| Ok(Some(enrollment(id, EnrollmentStatus::Pending))));
        store
            .expect_fetch_active_session()
            .returning(|id| Ok(Some(session(3, id, PaymentStatus::Created, Some("order_existing")))));
        store.expect_insert_session().never();
        store.expect_attach_gateway_order().never();
        mount(cfg, store, FakeGateway::default());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"orderId":"order_existing","amount":499900,"currency":"INR","key":"rzp_test_key","paymentId":3}"#);
}

#[actix_web::test]
async fn create_order_without_enrollment_id() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request(Credentials::None, "/payments/create-order", json!({}), |cfg| {
        let mut store = MockCheckoutStore::new();
        store.expect_fetch_enrollment().never();
        mount(cfg, store, FakeGateway::default());
    })
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"Could not read request body: enrollmentId is required"}"#);
}

#[actix_web::test]
async fn create_order_for_unknown_enrollment() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request(Credentials::None, "/payments/create-order", json!({"enrollmentId": 99}), |cfg| {
        let mut store = MockCheckoutStore::new();
        store.expect_fetch_enrollment().returning(|_| Ok(None));
        mount(cfg, store, FakeGateway::default());
    })
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Enrollment 99 does not exist"), "{body}");
}

#[actix_web::test]
async fn create_order_for_paid_enrollment() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request(Credentials::None, "/payments/create-order", json!({"enrollmentId": 7}), |cfg| {
        let mut store = MockCheckoutStore::new();
        store.expect_fetch_enrollment().returning(|id| Ok(Some(enrollment(id, EnrollmentStatus::Paid))));
        store.expect_fetch_active_session().never();
        mount(cfg, store, FakeGateway::default());
    })
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"Enrollment 7 has already been paid"}"#);
}

#[actix_web::test]
async fn create_order_database_failure_is_not_leaked() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request(Credentials::None, "/payments/create-order", json!({"enrollmentId": 7}), |cfg| {
        let mut store = MockCheckoutStore::new();
        store
            .expect_fetch_enrollment()
            .returning(|_| Err(EnrollmentError::DatabaseError("database is locked: /var/lib/academy.db".into())));
        mount(cfg, store, FakeGateway::default());
    })
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, r#"{"error":"An internal error occurred."}"#);
}

#[actix_web::test]
async fn create_order_gateway_rejection() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request(Credentials::None, "/payments/create-order", json!({"enrollmentId": 7}), |cfg| {
        let mut store = MockCheckoutStore::new();
        store.expect_fetch_enrollment().returning(|id| Ok(Some(enrollment(id, EnrollmentStatus::Pending))));
        store.expect_fetch_active_session().returning(|_| Ok(None));
        store.expect_insert_session().returning(|s| Ok(session(7, s.enrollment_id, PaymentStatus::Created, None)));
        store.expect_attach_gateway_order().never();
        store
            .expect_mark_session_failed()
            .withf(|id, failure| *id == 7 && failure.clear_order_id && failure.reason == "Authentication failed")
            .times(1)
            .returning(|id, _| Ok(session(id, 7, PaymentStatus::Failed, None)));
        let gateway = FakeGateway::default();
        gateway.fail_with(Some(GatewayError::Rejected {
            description: Some("Authentication failed".into()),
            raw: r#"{"error":{"code":"BAD_REQUEST_ERROR","description":"Authentication failed"}}"#.into(),
        }));
        mount(cfg, store, gateway);
    })
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"Authentication failed"}"#);
}

//-------------------------------------------------      verify      ---------------------------------------------------

#[actix_web::test]
async fn verify_valid_payment() {
    let _ = env_logger::try_init().ok();
    let signature = payment_signature(KEY_SECRET, "order_1", "pay_1");
    let request = json!({
        "razorpay_order_id": "order_1",
        "razorpay_payment_id": "pay_1",
        "razorpay_signature": signature,
        "paymentId": 7,
    });
    let (status, body) = post_request(Credentials::None, "/payments/verify", request, |cfg| {
        let mut store = MockCheckoutStore::new();
        store.expect_fetch_paid_session_by_gateway_payment().returning(|_| Ok(None));
        store.expect_fetch_session().returning(|id| Ok(Some(session(id, 7, PaymentStatus::Created, Some("order_1")))));
        store.expect_fetch_session_by_gateway_order().never();
        store
            .expect_settle_session()
            .withf(|id, details| *id == 7 && details.gateway_payment_id == "pay_1")
            .times(1)
            .returning(|id, _| Ok((session(id, 7, PaymentStatus::Paid, Some("order_1")), Some(enrollment(7, EnrollmentStatus::Paid)))));
        mount(cfg, store, FakeGateway::default());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"success":true,"paymentId":7}"#);
}

#[actix_web::test]
async fn verify_with_a_forged_signature() {
    let _ = env_logger::try_init().ok();
    let request = json!({
        "razorpay_order_id": "order_1",
        "razorpay_payment_id": "pay_1",
        "razorpay_signature": payment_signature("not_the_key_secret", "order_1", "pay_1"),
        "paymentId": 7,
    });
    let (status, body) = post_request(Credentials::None, "/payments/verify", request, |cfg| {
        let mut store = MockCheckoutStore::new();
        store.expect_fetch_session().returning(|id| Ok(Some(session(id, 7, PaymentStatus::Created, Some("order_1")))));
        store
            .expect_mark_session_failed()
            .withf(|id, failure| {
                *id == 7 && !failure.clear_order_id && failure.gateway_payment_id.is_none() && failure.reason.contains("pay_1")
            })
            .times(1)
            .returning(|id, _| Ok(session(id, 7, PaymentStatus::Failed, Some("order_1"))));
        store.expect_settle_session().never();
        mount(cfg, store, FakeGateway::default());
    })
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"success":false,"error":"Payment signature verification failed"}"#);
}

#[actix_web::test]
async fn forged_signature_leaves_sessions_of_other_orders_alone() {
    let _ = env_logger::try_init().ok();
    let request = json!({
        "razorpay_order_id": "order_1",
        "razorpay_payment_id": "pay_x",
        "razorpay_signature": "00",
        "paymentId": 8,
    });
    let (status, _) = post_request(Credentials::None, "/payments/verify", request, |cfg| {
        let mut store = MockCheckoutStore::new();
        store.expect_fetch_session().returning(|id| Ok(Some(session(id, 8, PaymentStatus::Created, Some("order_2")))));
        store.expect_mark_session_failed().never();
        mount(cfg, store, FakeGateway::default());
    })
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn verify_unmatched_payment_without_hints() {
    let _ = env_logger::try_init().ok();
    let signature = payment_signature(KEY_SECRET, "order_9", "pay_9");
    let request = json!({
        "razorpay_order_id": "order_9",
        "razorpay_payment_id": "pay_9",
        "razorpay_signature": signature,
    });
    let (status, body) = post_request(Credentials::None, "/payments/verify", request, |cfg| {
        let mut store = MockCheckoutStore::new();
        store.expect_fetch_paid_session_by_gateway_payment().returning(|_| Ok(None));
        store.expect_fetch_session_by_gateway_order().returning(|_| Ok(None));
        store.expect_fetch_enrollment().never();
        store
            .expect_insert_settled_session()
            .withf(|enrollment_id, amount, currency, details| {
                enrollment_id.is_none() &&
                    amount.value() == 0 &&
                    currency.to_string() == "INR" &&
                    details.gateway_payment_id == "pay_9"
            })
            .times(1)
            .returning(|_, _, _, details| {
                let mut s = session(12, 0, PaymentStatus::Paid, Some(&details.gateway_order_id));
                s.enrollment_id = None;
                Ok((s, None))
            });
        mount(cfg, store, FakeGateway::default());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"success":true,"paymentId":12}"#);
}

#[actix_web::test]
async fn verify_with_missing_fields() {
    let _ = env_logger::try_init().ok();
    let request = json!({ "razorpay_order_id": "order_1", "razorpay_signature": "  " });
    let (status, body) = post_request(Credentials::None, "/payments/verify", request, |cfg| {
        let mut store = MockCheckoutStore::new();
        store.expect_mark_session_failed().never();
        mount(cfg, store, FakeGateway::default());
    })
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        r#"{"success":false,"error":"Invalid request: razorpay_order_id, razorpay_payment_id and razorpay_signature are required"}"#
    );
}

//-------------------------------------------------     webhook      ---------------------------------------------------

fn captured_event(order_id: &str) -> String {
    json!({
        "entity": "event",
        "event": "payment.captured",
        "payload": { "payment": { "entity": {
            "id": "pay_29QQoUBi66xm2f",
            "order_id": order_id,
            "amount": 499900,
            "currency": "INR",
            "status": "captured",
        }}},
        "created_at": 1_728_000_000,
    })
    .to_string()
}

fn webhook_request(body: String, signature: Option<String>) -> TestRequest {
    let req = TestRequest::post().uri("/payments/webhook").insert_header(("Content-Type", "application/json"));
    let req = match signature {
        Some(sig) => req.insert_header((RAZORPAY_SIGNATURE_HEADER, sig)),
        None => req,
    };
    req.set_payload(body)
}

fn webhook_store() -> MockCheckoutStore {
    let mut store = MockCheckoutStore::new();
    store.expect_fetch_paid_session_by_gateway_payment().returning(|_| Ok(None));
    store.expect_fetch_session_by_gateway_order().returning(|order_id| {
        Ok((order_id == "order_1").then(|| session(7, 7, PaymentStatus::Created, Some("order_1"))))
    });
    store
        .expect_settle_session()
        .returning(|id, _| Ok((session(id, 7, PaymentStatus::Paid, Some("order_1")), Some(enrollment(7, EnrollmentStatus::Paid)))));
    store
}

#[actix_web::test]
async fn unsigned_webhook_is_rejected() {
    let _ = env_logger::try_init().ok();
    let (status, body) = send(webhook_request(captured_event("order_1"), None), Credentials::None, |cfg| {
        let mut store = MockCheckoutStore::new();
        store.expect_settle_session().never();
        mount(cfg, store, FakeGateway::default());
    })
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, r#"{"error":"Authentication Error. Request signature is invalid. No HMAC signature found."}"#);
}

#[actix_web::test]
async fn tampered_webhook_is_rejected() {
    let _ = env_logger::try_init().ok();
    let signature = calculate_hmac(WEBHOOK_SECRET, captured_event("order_1").as_bytes());
    let req = webhook_request(captured_event("order_2"), Some(signature));
    let (status, _) = send(req, Credentials::None, |cfg| {
        let mut store = MockCheckoutStore::new();
        store.expect_settle_session().never();
        mount(cfg, store, FakeGateway::default());
    })
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn signed_capture_settles_the_session() {
    let _ = env_logger::try_init().ok();
    let body = captured_event("order_1");
    let signature = calculate_hmac(WEBHOOK_SECRET, body.as_bytes());
    let (status, body) =
        send(webhook_request(body, Some(signature)), Credentials::None, |cfg| mount(cfg, webhook_store(), FakeGateway::default()))
            .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"success":true,"message":"Payment recorded."}"#);
}

#[actix_web::test]
async fn capture_for_unknown_order_is_acknowledged() {
    let _ = env_logger::try_init().ok();
    let body = captured_event("order_unknown");
    let signature = calculate_hmac(WEBHOOK_SECRET, body.as_bytes());
    let (status, body) =
        send(webhook_request(body, Some(signature)), Credentials::None, |cfg| mount(cfg, webhook_store(), FakeGateway::default()))
            .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"success":true,"message":"Payment does not match a known order."}"#);
}

#[actix_web::test]
async fn other_events_are_ignored() {
    let _ = env_logger::try_init().ok();
    let body = json!({ "event": "order.paid", "payload": {} }).to_string();
    let signature = calculate_hmac(WEBHOOK_SECRET, body.as_bytes());
    let (status, body) = send(webhook_request(body, Some(signature)), Credentials::None, |cfg| {
        let mut store = MockCheckoutStore::new();
        store.expect_fetch_session_by_gateway_order().never();
        mount(cfg, store, FakeGateway::default());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"success":true,"message":"Event ignored."}"#);
}
