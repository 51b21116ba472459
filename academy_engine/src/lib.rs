//! Academy Engine
//!
//! The academy engine holds the business logic of the learning platform: enrollments, the payment handshake with the
//! gateway, the course catalog and user accounts. It is independent of any web framework.
//!
//! The library is divided into three main sections:
//! 1. Data types ([`mod@db_types`]) and the storage and gateway contracts ([`mod@traits`]). A backend must implement
//!    the storage traits to be usable by the APIs. SQLite is the supported backend.
//! 2. Identifier and crypto helpers ([`mod@helpers`]): slugs, registration numbers, password hashing, payment
//!    signatures and verification tokens.
//! 3. The public APIs ([`CheckoutApi`], [`EnrollmentApi`], [`CatalogApi`] and [`UserApi`]). Each one is generic over
//!    its backend, so tests can substitute in-memory fakes or mocks.
mod api;

pub mod db_types;
pub mod helpers;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use api::{
    catalog_api::CatalogApi,
    checkout_api::{receipt_for, CheckoutApi, MAX_RECEIPT_LEN},
    checkout_objects,
    enrollment_api::EnrollmentApi,
    errors::CheckoutError,
    user_api::{UserApi, MIN_PASSWORD_LENGTH},
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
