use serde_json::Value;
use thiserror::Error;

use crate::db_types::MinorUnits;

#[derive(Debug, Clone)]
pub struct GatewayOrderRequest {
    pub amount: MinorUnits,
    pub currency: String,
    pub receipt: String,
    pub notes: Option<Value>,
}

/// The subset of the gateway's order record that the checkout flow needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: MinorUnits,
    pub currency: String,
}

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The gateway answered, but refused the request.
    #[error("Payment gateway rejected the request: {}", rejection_message(.description, .raw))]
    Rejected { description: Option<String>, raw: String },
    /// The gateway could not be reached or its response could not be understood.
    #[error("Payment gateway unavailable: {0}")]
    Unavailable(String),
}

impl GatewayError {
    /// The message shown to the caller: the gateway's own description when it supplied one, otherwise the raw error.
    pub fn client_message(&self) -> String {
        match self {
            Self::Rejected { description: Some(d), .. } => d.clone(),
            Self::Rejected { raw, .. } => raw.clone(),
            Self::Unavailable(e) => e.clone(),
        }
    }
}

fn rejection_message<'a>(description: &'a Option<String>, raw: &'a str) -> &'a str {
    description.as_deref().unwrap_or(raw)
}

#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    /// The public key id that the browser checkout widget needs alongside the order id.
    fn key_id(&self) -> &str;

    async fn create_order(&self, request: GatewayOrderRequest) -> Result<GatewayOrder, GatewayError>;
}
