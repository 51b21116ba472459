//! Registration numbers (URNs) have the form `{PREFIX}/{YEAR}/{XXXXX}` where the last part is five random upper-case
//! letters or digits, e.g. `STD/2024/7QK2M`.
use chrono::{Datelike, Utc};
use log::*;
use rand::Rng;

use crate::{
    db_types::RoleCategory,
    traits::{IdentifierError, IdentifierLookup},
};

pub const DEFAULT_URN_ATTEMPTS: usize = 6;
const URN_RANDOM_LEN: usize = 5;
const URN_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub fn registration_number_candidate(category: RoleCategory, year: i32) -> String {
    let mut rng = rand::thread_rng();
    let random = (0..URN_RANDOM_LEN)
        .map(|_| char::from(URN_CHARSET[rng.gen_range(0..URN_CHARSET.len())]))
        .collect::<String>();
    format!("{}/{year}/{random}", category.urn_prefix())
}

/// Appends the last four digits of `timestamp` to `candidate`.
pub fn with_timestamp_suffix(candidate: &str, timestamp: i64) -> String {
    format!("{candidate}{:04}", timestamp.rem_euclid(10_000))
}

/// Generates a registration number that is not in use yet.
///
/// Up to `attempts` random candidates are checked. If every one of them collides, the last candidate is returned with
/// the last four digits of the current unix timestamp appended. That final value is not checked; the unique index on
/// the users table is the backstop and callers retry the insert on a collision.
pub async fn generate_registration_number<L: IdentifierLookup>(
    lookup: &L,
    category: RoleCategory,
    attempts: usize,
) -> Result<String, IdentifierError> {
    let now = Utc::now();
    let mut candidate = registration_number_candidate(category, now.year());
    for attempt in 1..=attempts.max(1) {
        if !lookup.registration_number_exists(&candidate).await? {
            return Ok(candidate);
        }
        debug!("🪪️ Registration number {candidate} is taken (attempt {attempt}/{attempts})");
        if attempt < attempts {
            candidate = registration_number_candidate(category, now.year());
        }
    }
    let fallback = with_timestamp_suffix(&candidate, now.timestamp());
    warn!("🪪️ Could not find a free registration number in {attempts} attempts. Falling back to {fallback}");
    Ok(fallback)
}
