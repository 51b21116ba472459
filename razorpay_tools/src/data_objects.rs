use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for `POST /orders`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    /// Amount in minor currency units.
    pub amount: i64,
    pub currency: String,
    /// Merchant reference. Razorpay rejects receipts longer than 40 characters.
    pub receipt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderEntity {
    pub id: String,
    #[serde(default)]
    pub entity: String,
    pub amount: i64,
    #[serde(default)]
    pub amount_paid: i64,
    #[serde(default)]
    pub amount_due: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    pub status: String,
    #[serde(default)]
    pub attempts: i64,
    #[serde(default)]
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEntity {
    pub id: String,
    pub order_id: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// The error envelope Razorpay returns with non-2xx responses:
/// `{ "error": { "code": "BAD_REQUEST_ERROR", "description": "...", ... } }`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayErrorBody {
    #[serde(default)]
    pub error: Option<GatewayErrorDetail>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayErrorDetail {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub step: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub field: Option<String>,
}

impl GatewayErrorBody {
    pub fn description(&self) -> Option<&str> {
        self.error.as_ref().and_then(|e| e.description.as_deref()).filter(|s| !s.is_empty())
    }
}

//--------------------------------------------   Webhooks   -----------------------------------------------------------
/// A webhook notification. Only `payment.*` events carry a payment entity; everything else is acknowledged and
/// ignored by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    #[serde(default)]
    pub payload: WebhookPayload,
    #[serde(default)]
    pub created_at: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub payment: Option<WebhookPaymentWrapper>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPaymentWrapper {
    pub entity: PaymentEntity,
}

impl WebhookEvent {
    pub fn payment(&self) -> Option<&PaymentEntity> {
        self.payload.payment.as_ref().map(|p| &p.entity)
    }
}
