use std::str::FromStr;

use academy_engine::{
    checkout_objects::{GatewayPaymentEvent, VerifyPaymentRequest},
    db_types::{CourseType, EnrollmentStatus, MinorUnits, NewEnrollment, PaymentStatus},
    helpers::payment_signature,
    traits::{GatewayError, PaymentSessionManagement},
    CheckoutError,
};
use cucumber::{then, when};

use crate::cucumber::{checkout_world::KEY_SECRET, CheckoutWorld};

#[when(expr = "{word} enrolls in the {word} {string} for {int} {word}")]
async fn enroll(world: &mut CheckoutWorld, email: String, kind: String, slug: String, amount: i64, currency: String) {
    let kind = CourseType::from_str(&kind).expect("Not a valid course type");
    #[allow(clippy::cast_precision_loss)]
    let enrollment = NewEnrollment::new(email, kind, slug).with_amount(amount as f64).with_currency(currency);
    let enrollment =
        world.system().enrollments.create_enrollment(enrollment).await.expect("Error creating enrollment");
    world.enrollment = Some(enrollment);
}

#[when("the payment gateway is down")]
async fn gateway_down(world: &mut CheckoutWorld) {
    let error = GatewayError::Rejected { description: Some("Service unavailable".into()), raw: "{}".into() };
    world.system().checkout.gateway().fail_with(Some(error));
}

#[when("the payment gateway recovers")]
async fn gateway_up(world: &mut CheckoutWorld) {
    world.system().checkout.gateway().fail_with(None);
}

#[when("the learner requests a payment order")]
async fn request_order(world: &mut CheckoutWorld) {
    let id = world.enrollment_id();
    let result = world.system().checkout.create_order(id).await;
    world.last_order = Some(result);
}

#[when(expr = "the learner pays with payment id {string} and a valid signature")]
async fn pay_valid(world: &mut CheckoutWorld, payment_id: String) {
    let order = world.order().clone();
    let signature = payment_signature(KEY_SECRET, &order.order_id, &payment_id);
    let request = VerifyPaymentRequest::new(order.order_id, payment_id, signature).with_session_hint(order.payment_id);
    let result = world.system().checkout.verify_payment(request).await;
    world.last_verification = Some(result);
}

#[when(expr = "the learner pays with payment id {string} and the signature {string}")]
async fn pay_with_signature(world: &mut CheckoutWorld, payment_id: String, signature: String) {
    let order = world.order().clone();
    let request = VerifyPaymentRequest::new(order.order_id, payment_id, signature).with_session_hint(order.payment_id);
    let result = world.system().checkout.verify_payment(request).await;
    world.last_verification = Some(result);
}

#[when(expr = "the gateway reports payment {string} as captured")]
async fn payment_captured(world: &mut CheckoutWorld, payment_id: String) {
    let order = world.order().clone();
    let event = GatewayPaymentEvent {
        gateway_order_id: order.order_id,
        gateway_payment_id: payment_id,
        amount: order.amount,
        currency: order.currency,
        failure_description: None,
    };
    let session = world.system().checkout.payment_captured(event).await.expect("Error handling capture");
    assert!(session.is_some(), "The captured payment did not match a session");
}

#[then(expr = "the order is for {int} minor units of {word}")]
async fn check_order_amount(world: &mut CheckoutWorld, amount: i64, currency: String) {
    let order = world.order();
    assert_eq!(order.amount, MinorUnits::from(amount));
    assert_eq!(order.currency, currency);
}

#[then("the order request fails with a gateway error")]
async fn check_order_failed(world: &mut CheckoutWorld) {
    let result = world.last_order.as_ref().expect("No order has been requested");
    assert!(matches!(result, Err(CheckoutError::GatewayError(_))), "Expected a gateway error, got {result:?}");
}

#[then(regex = r"^the enrollment has (\d+) payment sessions?$")]
async fn check_session_count(world: &mut CheckoutWorld, count: usize) {
    let id = world.enrollment_id();
    let sessions = world.system().db.fetch_sessions_for_enrollment(id).await.expect("Error fetching sessions");
    assert_eq!(sessions.len(), count);
}

#[then(expr = "the payment session is {word}")]
async fn check_session_status(world: &mut CheckoutWorld, status: String) {
    let expected = PaymentStatus::from_str(&status).expect("Not a valid payment status");
    let id = world.order().payment_id;
    let session = world.system().db.fetch_session(id).await.expect("Error fetching session").expect("No session");
    assert_eq!(session.status, expected);
}

#[then("the verification succeeds")]
async fn check_verified(world: &mut CheckoutWorld) {
    let result = world.last_verification.as_ref().expect("No verification has been attempted");
    match result {
        Ok(response) => assert!(response.success),
        Err(e) => panic!("Verification failed: {e}"),
    }
}

#[then("the verification is rejected")]
async fn check_rejected(world: &mut CheckoutWorld) {
    let result = world.last_verification.as_ref().expect("No verification has been attempted");
    assert!(matches!(result, Err(CheckoutError::SignatureMismatch)), "Expected a signature mismatch, got {result:?}");
}

#[then(expr = "the enrollment is {word}")]
async fn check_enrollment_status(world: &mut CheckoutWorld, status: String) {
    let expected = EnrollmentStatus::from_str(&status).expect("Not a valid enrollment status");
    let id = world.enrollment_id();
    let enrollment = world.system().enrollments.fetch_enrollment(id).await.expect("Error fetching").expect("Missing");
    assert_eq!(enrollment.status, expected);
}

#[then("the gateway was asked for 1 order")]
async fn check_one_gateway_call(world: &mut CheckoutWorld) {
    assert_eq!(world.system().checkout.gateway().calls(), 1);
}
