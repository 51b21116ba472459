use thiserror::Error;

use crate::traits::{EnrollmentError, GatewayError, PaymentSessionError};

#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    #[error("Invalid request: {0}")]
    InvalidInput(String),
    #[error("Enrollment {0} does not exist")]
    EnrollmentNotFound(i64),
    #[error("Payment session {0} does not exist")]
    SessionNotFound(i64),
    #[error("{0}")]
    InvalidState(String),
    #[error("{0}")]
    GatewayError(#[from] GatewayError),
    #[error("Payment signature verification failed")]
    SignatureMismatch,
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<EnrollmentError> for CheckoutError {
    fn from(e: EnrollmentError) -> Self {
        match e {
            EnrollmentError::DatabaseError(s) => Self::DatabaseError(s),
            EnrollmentError::NotFound(id) => Self::EnrollmentNotFound(id),
            EnrollmentError::InvalidInput(s) => Self::InvalidInput(s),
            e @ (EnrollmentError::AlreadyExists { .. } | EnrollmentError::InvalidState { .. }) => {
                Self::InvalidState(e.to_string())
            },
        }
    }
}

impl From<PaymentSessionError> for CheckoutError {
    fn from(e: PaymentSessionError) -> Self {
        match e {
            PaymentSessionError::DatabaseError(s) => Self::DatabaseError(s),
            PaymentSessionError::SessionNotFound(id) => Self::SessionNotFound(id),
            PaymentSessionError::EnrollmentNotFound(id) => Self::EnrollmentNotFound(id),
            e @ (PaymentSessionError::DuplicateActiveSession(_) |
            PaymentSessionError::InvalidTransition { .. } |
            PaymentSessionError::PaymentAlreadyRecorded { .. }) => Self::InvalidState(e.to_string()),
        }
    }
}
