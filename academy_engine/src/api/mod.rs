//! # Academy engine public API
//!
//! The API objects wrap a storage backend (and, for checkout, a payment gateway) and implement the business rules on
//! top of the storage traits. They are independent of each other, so a server can construct only the ones it needs.
//!
//! * [`checkout_api`] creates gateway orders for enrollments and verifies the payments that come back.
//! * [`enrollment_api`] creates and queries enrollments and their payment history.
//! * [`catalog_api`] manages catalog items, including slug generation.
//! * [`user_api`] registers users, checks credentials and verifies e-mail addresses.
//!
//! # API usage
//!
//! ```rust,ignore
//! use academy_engine::{EnrollmentApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(url, 25).await?;
//! let api = EnrollmentApi::new(db);
//! let mine = api.enrollments_for_user("a@b.com").await?;
//! ```
pub mod catalog_api;
pub mod checkout_api;
pub mod checkout_objects;
pub mod enrollment_api;
pub mod errors;
pub mod user_api;
