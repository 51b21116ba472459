use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{config::RazorpayConfig, GatewayErrorBody, NewOrder, OrderEntity, RazorpayApiError};

#[derive(Clone)]
pub struct RazorpayApi {
    config: RazorpayConfig,
    client: Arc<Client>,
}

impl RazorpayApi {
    pub fn new(config: RazorpayConfig) -> Result<Self, RazorpayApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| RazorpayApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn key_id(&self) -> &str {
        self.config.key_id.as_str()
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        body: Option<B>,
    ) -> Result<T, RazorpayApiError> {
        let url = self.url(path);
        trace!("Sending REST query: {method} {url}");
        let mut req = self
            .client
            .request(method, url)
            .basic_auth(&self.config.key_id, Some(self.config.key_secret.reveal()));
        if !params.is_empty() {
            req = req.query(params);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| RazorpayApiError::RestRequestError(e.to_string()))?;
        if response.status().is_success() {
            trace!("REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| RazorpayApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| RazorpayApiError::RestResponseError(e.to_string()))?;
            Err(error_from_response(status, message))
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url.trim_end_matches('/'))
    }

    pub async fn create_order(&self, order: NewOrder) -> Result<OrderEntity, RazorpayApiError> {
        debug!("Creating gateway order for receipt {} ({} {})", order.receipt, order.amount, order.currency);
        let result = self.rest_query::<OrderEntity, NewOrder>(Method::POST, "/orders", &[], Some(order)).await?;
        info!("Created gateway order {} for receipt {:?}", result.id, result.receipt);
        Ok(result)
    }

    pub async fn fetch_order(&self, order_id: &str) -> Result<OrderEntity, RazorpayApiError> {
        let path = format!("/orders/{order_id}");
        debug!("Fetching gateway order {order_id}");
        self.rest_query::<OrderEntity, ()>(Method::GET, &path, &[], None).await
    }
}

/// Razorpay usually answers errors with a JSON envelope. Anything else is passed through as text.
fn error_from_response(status: u16, message: String) -> RazorpayApiError {
    match serde_json::from_str::<GatewayErrorBody>(&message) {
        Ok(body) if body.error.is_some() => RazorpayApiError::GatewayError { status, body },
        _ => RazorpayApiError::QueryError { status, message },
    }
}
