use chrono::{DateTime, Duration, Utc};
use rand::RngCore;

pub const VERIFICATION_TOKEN_TTL_HOURS: i64 = 24;
const TOKEN_BYTES: usize = 32;

/// A fresh url-safe e-mail verification token and its expiry time.
pub fn new_verification_token(now: DateTime<Utc>) -> (String, DateTime<Utc>) {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    let token = base64::encode_config(bytes, base64::URL_SAFE_NO_PAD);
    (token, now + Duration::hours(VERIFICATION_TOKEN_TTL_HOURS))
}
