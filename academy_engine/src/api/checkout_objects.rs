use serde::{Deserialize, Serialize};

use crate::db_types::MinorUnits;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub enrollment_id: Option<i64>,
}

/// Everything the browser checkout widget needs to open a payment for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub order_id: String,
    /// Minor currency units.
    pub amount: MinorUnits,
    pub currency: String,
    /// The gateway's public key id.
    pub key: String,
    /// The payment session id. Send it back as `paymentId` when verifying.
    pub payment_id: i64,
}

/// The fields the gateway's checkout widget returns on success, plus optional hints identifying the session or
/// enrollment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyPaymentRequest {
    #[serde(default)]
    pub razorpay_order_id: Option<String>,
    #[serde(default)]
    pub razorpay_payment_id: Option<String>,
    #[serde(default)]
    pub razorpay_signature: Option<String>,
    #[serde(default, rename = "paymentId")]
    pub payment_id: Option<i64>,
    #[serde(default, rename = "enrollmentId")]
    pub enrollment_id: Option<i64>,
}

impl VerifyPaymentRequest {
    pub fn new<S: Into<String>>(order_id: S, payment_id: S, signature: S) -> Self {
        Self {
            razorpay_order_id: Some(order_id.into()),
            razorpay_payment_id: Some(payment_id.into()),
            razorpay_signature: Some(signature.into()),
            payment_id: None,
            enrollment_id: None,
        }
    }

    pub fn with_session_hint(mut self, session_id: i64) -> Self {
        self.payment_id = Some(session_id);
        self
    }

    pub fn with_enrollment_hint(mut self, enrollment_id: i64) -> Self {
        self.enrollment_id = Some(enrollment_id);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VerifyPaymentResponse {
    pub fn success(session_id: i64) -> Self {
        Self { success: true, payment_id: Some(session_id), error: None }
    }

    pub fn failure<S: Into<String>>(error: S) -> Self {
        Self { success: false, payment_id: None, error: Some(error.into()) }
    }
}

/// A payment reported by the gateway's webhook.
#[derive(Debug, Clone)]
pub struct GatewayPaymentEvent {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub amount: MinorUnits,
    pub currency: String,
    pub failure_description: Option<String>,
}
