mod passwords;
mod payment_signature;
mod registration_number;
mod slug;
mod verification_token;

pub use passwords::{hash_password, verify_password};
pub use payment_signature::{payment_signature, verify_payment_signature};
pub use registration_number::{
    generate_registration_number,
    registration_number_candidate,
    with_timestamp_suffix,
    DEFAULT_URN_ATTEMPTS,
};
pub use slug::{generate_slug, slugify, MAX_SLUG_ATTEMPTS};
pub use verification_token::{new_verification_token, VERIFICATION_TOKEN_TTL_HOURS};
