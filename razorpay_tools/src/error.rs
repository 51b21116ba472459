use thiserror::Error;

use crate::GatewayErrorBody;

#[derive(Debug, Error)]
pub enum RazorpayApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid REST request: {0}")]
    RestRequestError(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Gateway rejected the request. Error {status}. {}", .body.description().unwrap_or("No description"))]
    GatewayError { status: u16, body: GatewayErrorBody },
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
}

impl RazorpayApiError {
    /// The human-readable description supplied by the gateway, if there is one.
    pub fn gateway_description(&self) -> Option<&str> {
        match self {
            Self::GatewayError { body, .. } => body.description(),
            _ => None,
        }
    }

    /// A serialized form of the raw error, for when no description is available.
    pub fn raw(&self) -> String {
        match self {
            Self::GatewayError { body, .. } => {
                serde_json::to_string(body).unwrap_or_else(|_| self.to_string())
            },
            Self::QueryError { message, .. } => message.clone(),
            _ => self.to_string(),
        }
    }
}
