use std::time::Duration;

use academy_common::Secret;
use log::*;

pub const DEFAULT_RAZORPAY_API_URL: &str = "https://api.razorpay.com/v1";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct RazorpayConfig {
    /// Base URL of the REST API, without a trailing slash. Overridable so that tests can point at a local stub.
    pub api_url: String,
    /// The public key id. This is also handed to the browser checkout widget.
    pub key_id: String,
    /// The key secret. Used for basic auth on API calls and for payment signature verification.
    pub key_secret: Secret<String>,
    pub timeout: Duration,
}

impl Default for RazorpayConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_RAZORPAY_API_URL.to_string(),
            key_id: String::default(),
            key_secret: Secret::default(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl RazorpayConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("ACADEMY_RAZORPAY_API_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| DEFAULT_RAZORPAY_API_URL.to_string());
        let key_id = std::env::var("ACADEMY_RAZORPAY_KEY_ID").unwrap_or_else(|_| {
            warn!("🪛️ ACADEMY_RAZORPAY_KEY_ID not set. Order creation will be rejected by the gateway.");
            String::default()
        });
        let key_secret = Secret::new(std::env::var("ACADEMY_RAZORPAY_KEY_SECRET").unwrap_or_else(|_| {
            warn!(
                "🪛️ ACADEMY_RAZORPAY_KEY_SECRET not set. Order creation and payment verification will both fail \
                 until it is."
            );
            String::default()
        }));
        let timeout = std::env::var("ACADEMY_GATEWAY_TIMEOUT_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ Invalid value for ACADEMY_GATEWAY_TIMEOUT_SECS ({s}). {e}"))
                    .ok()
            })
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        Self { api_url, key_id, key_secret, timeout }
    }
}
