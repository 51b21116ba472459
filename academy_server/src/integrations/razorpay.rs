//! Glue between the Razorpay REST client and the checkout engine.
use academy_engine::{
    checkout_objects::GatewayPaymentEvent,
    db_types::MinorUnits,
    traits::{GatewayError, GatewayOrder, GatewayOrderRequest, PaymentGateway},
};
use log::*;
use razorpay_tools::{NewOrder, PaymentEntity, RazorpayApi, RazorpayApiError};

/// A [`PaymentGateway`] backed by the Razorpay orders API.
#[derive(Clone)]
pub struct RazorpayGateway {
    api: RazorpayApi,
}

impl RazorpayGateway {
    pub fn new(api: RazorpayApi) -> Self {
        Self { api }
    }
}

impl PaymentGateway for RazorpayGateway {
    fn key_id(&self) -> &str {
        self.api.key_id()
    }

    async fn create_order(&self, request: GatewayOrderRequest) -> Result<GatewayOrder, GatewayError> {
        let order = NewOrder {
            amount: request.amount.value(),
            currency: request.currency,
            receipt: request.receipt,
            notes: request.notes,
        };
        let entity = self.api.create_order(order).await.map_err(|e| {
            warn!("💳️ Razorpay order creation failed. {e}");
            gateway_error(e)
        })?;
        Ok(GatewayOrder { id: entity.id, amount: MinorUnits::from(entity.amount), currency: entity.currency })
    }
}

/// Errors the gateway answered with become rejections. Transport and decoding failures mean the gateway is
/// unavailable.
pub fn gateway_error(e: RazorpayApiError) -> GatewayError {
    match e {
        RazorpayApiError::GatewayError { .. } | RazorpayApiError::QueryError { .. } => {
            GatewayError::Rejected { description: e.gateway_description().map(String::from), raw: e.raw() }
        },
        e => GatewayError::Unavailable(e.to_string()),
    }
}

/// Converts the payment entity in a webhook notification into an engine event. Payments that are not attached to an
/// order cannot be matched to a payment session and are ignored.
pub fn payment_event(payment: &PaymentEntity) -> Option<GatewayPaymentEvent> {
    let order_id = payment.order_id.as_deref().filter(|s| !s.is_empty())?;
    Some(GatewayPaymentEvent {
        gateway_order_id: order_id.to_string(),
        gateway_payment_id: payment.id.clone(),
        amount: MinorUnits::from(payment.amount),
        currency: payment.currency.clone(),
        failure_description: payment.error_description.clone(),
    })
}
