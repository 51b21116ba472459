//! A small typed client for the Razorpay REST API.
//!
//! Only the parts of the API that the academy checkout flow needs are covered: creating orders, fetching them back,
//! and the webhook payloads that Razorpay posts when a payment is captured or fails.
mod api;
mod config;
mod error;

mod data_objects;

pub use api::RazorpayApi;
pub use config::RazorpayConfig;
pub use data_objects::{
    GatewayErrorBody,
    GatewayErrorDetail,
    NewOrder,
    OrderEntity,
    PaymentEntity,
    WebhookEvent,
    WebhookPayload,
    WebhookPaymentWrapper,
};
pub use error::RazorpayApiError;
