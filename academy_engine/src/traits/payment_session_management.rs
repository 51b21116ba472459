use thiserror::Error;

use crate::db_types::{
    Enrollment,
    MinorUnits,
    NewPaymentSession,
    PaymentSession,
    PaymentStatus,
    SessionFailure,
    SettlementDetails,
};

#[derive(Debug, Clone, Error)]
pub enum PaymentSessionError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Enrollment {0} already has an active payment session")]
    DuplicateActiveSession(i64),
    #[error("Payment session {0} does not exist")]
    SessionNotFound(i64),
    #[error("Enrollment {0} does not exist")]
    EnrollmentNotFound(i64),
    #[error("Payment session {id} cannot move from {from} to {to}")]
    InvalidTransition { id: i64, from: PaymentStatus, to: PaymentStatus },
    #[error("Payment {payment_id} has already been recorded against payment session {session_id}")]
    PaymentAlreadyRecorded { payment_id: String, session_id: i64 },
}

impl From<sqlx::Error> for PaymentSessionError {
    fn from(e: sqlx::Error) -> Self {
        PaymentSessionError::DatabaseError(e.to_string())
    }
}

/// Storage for payment sessions.
///
/// A session moves `created → paid` or `created → failed` and never leaves either end state. At most one session per
/// enrollment may be `created` or `paid` at any time; backends must enforce that with a constraint rather than a
/// read-then-write check, and report violations as [`PaymentSessionError::DuplicateActiveSession`]. Likewise a gateway
/// payment id settles at most one session ([`PaymentSessionError::PaymentAlreadyRecorded`]).
#[allow(async_fn_in_trait)]
pub trait PaymentSessionManagement {
    /// The session for the enrollment that is currently `created` or `paid`, if any.
    async fn fetch_active_session(&self, enrollment_id: i64) -> Result<Option<PaymentSession>, PaymentSessionError>;

    async fn insert_session(&self, session: NewPaymentSession) -> Result<PaymentSession, PaymentSessionError>;

    /// Records the gateway order id on a `created` session.
    async fn attach_gateway_order(
        &self,
        session_id: i64,
        gateway_order_id: &str,
    ) -> Result<PaymentSession, PaymentSessionError>;

    /// Moves a `created` session to `failed`.
    async fn mark_session_failed(
        &self,
        session_id: i64,
        failure: SessionFailure,
    ) -> Result<PaymentSession, PaymentSessionError>;

    async fn fetch_session(&self, session_id: i64) -> Result<Option<PaymentSession>, PaymentSessionError>;

    /// The session carrying the given gateway order id. A `created` or `paid` session wins over failed ones, then the
    /// most recent.
    async fn fetch_session_by_gateway_order(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<PaymentSession>, PaymentSessionError>;

    /// The `paid` session that the gateway payment settled, if any.
    async fn fetch_paid_session_by_gateway_payment(
        &self,
        gateway_payment_id: &str,
    ) -> Result<Option<PaymentSession>, PaymentSessionError>;

    async fn fetch_sessions_for_enrollment(
        &self,
        enrollment_id: i64,
    ) -> Result<Vec<PaymentSession>, PaymentSessionError>;

    /// In a single atomic transaction, marks the session `paid` with the given gateway details and marks the
    /// session's enrollment `paid`.
    ///
    /// Settling a session that is already `paid` with the same payment id is a no-op that returns the current state.
    async fn settle_session(
        &self,
        session_id: i64,
        details: SettlementDetails,
    ) -> Result<(PaymentSession, Option<Enrollment>), PaymentSessionError>;

    /// Records a verified payment for which no session exists. In a single atomic transaction:
    /// * any `created` session for the enrollment is marked `failed` (it has been superseded),
    /// * a new `paid` session is inserted,
    /// * the enrollment is marked `paid`.
    ///
    /// Without an enrollment only the `paid` session is inserted.
    async fn insert_settled_session(
        &self,
        enrollment_id: Option<i64>,
        amount: MinorUnits,
        currency: &str,
        details: SettlementDetails,
    ) -> Result<(PaymentSession, Option<Enrollment>), PaymentSessionError>;
}
