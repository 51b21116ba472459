//! Gateway payment signatures.
//!
//! When a checkout completes, the gateway hands the browser an order id, a payment id and a signature. The signature
//! is the lower-case hex encoding of `HMAC-SHA256(key_secret, "{order_id}|{payment_id}")`.
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_HEX_LEN: usize = 64;

fn signature_mac(secret: &str, order_id: &str, payment_id: &str) -> HmacSha256 {
    #[allow(clippy::expect_used)]
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    mac
}

/// The signature the gateway is expected to produce for the given order and payment.
pub fn payment_signature(secret: &str, order_id: &str, payment_id: &str) -> String {
    hex::encode(signature_mac(secret, order_id, payment_id).finalize().into_bytes())
}

/// Checks `signature` against the expected value in constant time.
///
/// The comparison has the same outcome as comparing the hex strings byte for byte: upper-case hex digits are not
/// accepted.
pub fn verify_payment_signature(secret: &str, order_id: &str, payment_id: &str, signature: &str) -> bool {
    if signature.len() != SIGNATURE_HEX_LEN || signature.bytes().any(|b| b.is_ascii_uppercase()) {
        return false;
    }
    let Ok(supplied) = hex::decode(signature) else {
        return false;
    };
    signature_mac(secret, order_id, payment_id).verify_slice(&supplied).is_ok()
}
