use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};

use crate::traits::{GatewayError, GatewayOrder, GatewayOrderRequest, PaymentGateway};

pub const FAKE_KEY_ID: &str = "rzp_test_key";

/// An in-process stand-in for the payment gateway. Orders are numbered `order_1`, `order_2`, ... in the order they
/// are requested. Set a failure with [`FakeGateway::fail_with`] to make every following request fail.
#[derive(Debug, Default)]
pub struct FakeGateway {
    calls: AtomicUsize,
    failure: Mutex<Option<GatewayError>>,
    requests: Mutex<Vec<GatewayOrderRequest>>,
}

impl FakeGateway {
    pub fn fail_with(&self, error: Option<GatewayError>) {
        *self.failure.lock().unwrap() = error;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<GatewayOrderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl PaymentGateway for FakeGateway {
    fn key_id(&self) -> &str {
        FAKE_KEY_ID
    }

    async fn create_order(&self, request: GatewayOrderRequest) -> Result<GatewayOrder, GatewayError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(e) = self.failure.lock().unwrap().clone() {
            return Err(e);
        }
        let order = GatewayOrder { id: format!("order_{n}"), amount: request.amount, currency: request.currency.clone() };
        self.requests.lock().unwrap().push(request);
        Ok(order)
    }
}
