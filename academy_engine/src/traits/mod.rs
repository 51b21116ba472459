//! # Storage and gateway contracts
//!
//! This module defines the interfaces that a storage *backend* must provide for the academy engine APIs to work, plus
//! the contract for the external payment gateway.
//!
//! * [`EnrollmentManagement`] creates, queries and cancels enrollments.
//! * [`PaymentSessionManagement`] owns the payment session state machine, including the atomic settlement of a
//!   session together with its enrollment.
//! * [`CatalogManagement`] stores catalog items (courses, skill paths and career paths).
//! * [`UserManagement`] stores user accounts and e-mail verification tokens.
//! * [`IdentifierLookup`] answers "is this slug / registration number already taken?" for the identifier generators.
//! * [`PaymentGateway`] creates orders on the third-party gateway.
mod catalog_management;
mod enrollment_management;
mod identifier_lookup;
mod payment_gateway;
mod payment_session_management;
mod user_management;

pub use catalog_management::{CatalogError, CatalogManagement};
pub use enrollment_management::{EnrollmentError, EnrollmentManagement, EnrollmentQueryFilter};
pub use identifier_lookup::{IdentifierError, IdentifierLookup};
pub use payment_gateway::{GatewayError, GatewayOrder, GatewayOrderRequest, PaymentGateway};
pub use payment_session_management::{PaymentSessionError, PaymentSessionManagement};
pub use user_management::{UserApiError, UserManagement};
