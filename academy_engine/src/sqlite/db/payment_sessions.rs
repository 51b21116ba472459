use log::{debug, trace, warn};
use sqlx::SqliteConnection;

use crate::{
    db_types::{
        Enrollment,
        EnrollmentStatus,
        MinorUnits,
        NewPaymentSession,
        PaymentSession,
        PaymentStatus,
        SessionFailure,
        SettlementDetails,
    },
    sqlite::db::enrollments,
    traits::PaymentSessionError,
};

pub async fn fetch_session(id: i64, conn: &mut SqliteConnection) -> Result<Option<PaymentSession>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payment_sessions WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_active_session(
    enrollment_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentSession>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM payment_sessions WHERE enrollment_id = $1 AND status IN ('created', 'paid') ORDER BY id DESC \
         LIMIT 1",
    )
    .bind(enrollment_id)
    .fetch_optional(conn)
    .await
}

pub async fn fetch_session_by_gateway_order(
    gateway_order_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentSession>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM payment_sessions WHERE gateway_order_id = $1 ORDER BY CASE WHEN status IN ('created', 'paid') \
         THEN 0 ELSE 1 END, id DESC LIMIT 1",
    )
    .bind(gateway_order_id)
    .fetch_optional(conn)
    .await
}

/// The `paid` session that the gateway payment was recorded against, if any.
pub async fn fetch_paid_session_by_gateway_payment(
    gateway_payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentSession>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payment_sessions WHERE gateway_payment_id = $1 AND status = 'paid'")
        .bind(gateway_payment_id)
        .fetch_optional(conn)
        .await
}

fn is_payment_index_violation(e: &dyn sqlx::error::DatabaseError) -> bool {
    e.is_unique_violation() && e.message().contains("gateway_payment_id")
}

/// Fails with [`PaymentSessionError::PaymentAlreadyRecorded`] if the payment settled a session other than `session_id`.
async fn ensure_payment_unrecorded(
    session_id: Option<i64>,
    gateway_payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<(), PaymentSessionError> {
    match fetch_paid_session_by_gateway_payment(gateway_payment_id, conn).await? {
        Some(s) if Some(s.id) != session_id => Err(PaymentSessionError::PaymentAlreadyRecorded {
            payment_id: gateway_payment_id.to_string(),
            session_id: s.id,
        }),
        _ => Ok(()),
    }
}

pub async fn fetch_sessions_for_enrollment(
    enrollment_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<PaymentSession>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payment_sessions WHERE enrollment_id = $1 ORDER BY id ASC")
        .bind(enrollment_id)
        .fetch_all(conn)
        .await
}

async fn insert(
    enrollment_id: Option<i64>,
    amount: MinorUnits,
    currency: &str,
    status: PaymentStatus,
    details: Option<&SettlementDetails>,
    conn: &mut SqliteConnection,
) -> Result<PaymentSession, PaymentSessionError> {
    let result: Result<PaymentSession, sqlx::Error> = sqlx::query_as(
        r#"
            INSERT INTO payment_sessions (
                enrollment_id,
                amount,
                currency,
                status,
                gateway_order_id,
                gateway_payment_id,
                gateway_signature
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(enrollment_id)
    .bind(amount)
    .bind(currency)
    .bind(status)
    .bind(details.map(|d| d.gateway_order_id.as_str()))
    .bind(details.map(|d| d.gateway_payment_id.as_str()))
    .bind(details.and_then(|d| d.gateway_signature.as_deref()))
    .fetch_one(&mut *conn)
    .await;
    match result {
        Ok(s) => Ok(s),
        Err(sqlx::Error::Database(e)) if is_payment_index_violation(&*e) => {
            let payment_id = details.map(|d| d.gateway_payment_id.clone()).unwrap_or_default();
            let session_id = match fetch_paid_session_by_gateway_payment(&payment_id, conn).await? {
                Some(s) => s.id,
                None => return Err(PaymentSessionError::DatabaseError(e.to_string())),
            };
            Err(PaymentSessionError::PaymentAlreadyRecorded { payment_id, session_id })
        },
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => match enrollment_id {
            Some(id) => Err(PaymentSessionError::DuplicateActiveSession(id)),
            None => Err(PaymentSessionError::DatabaseError(e.to_string())),
        },
        Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => match enrollment_id {
            Some(id) => Err(PaymentSessionError::EnrollmentNotFound(id)),
            None => Err(PaymentSessionError::DatabaseError(e.to_string())),
        },
        Err(e) => Err(e.into()),
    }
}

/// Inserts a new `created` session. The partial unique index on `payment_sessions` rejects a second live session for
/// the same enrollment, which is reported as [`PaymentSessionError::DuplicateActiveSession`].
pub async fn insert_session(
    session: NewPaymentSession,
    conn: &mut SqliteConnection,
) -> Result<PaymentSession, PaymentSessionError> {
    let NewPaymentSession { enrollment_id, amount, currency } = session;
    let session = insert(Some(enrollment_id), amount, &currency, PaymentStatus::Created, None, conn).await?;
    debug!("🗃️ Payment session #{} created for enrollment #{enrollment_id}", session.id);
    Ok(session)
}

/// Builds the error for a conditional update that matched no rows.
async fn transition_error(
    id: i64,
    to: PaymentStatus,
    conn: &mut SqliteConnection,
) -> Result<PaymentSessionError, sqlx::Error> {
    let err = match fetch_session(id, conn).await? {
        Some(s) => PaymentSessionError::InvalidTransition { id, from: s.status, to },
        None => PaymentSessionError::SessionNotFound(id),
    };
    Ok(err)
}

pub async fn attach_gateway_order(
    id: i64,
    gateway_order_id: &str,
    conn: &mut SqliteConnection,
) -> Result<PaymentSession, PaymentSessionError> {
    let updated: Option<PaymentSession> = sqlx::query_as(
        "UPDATE payment_sessions SET gateway_order_id = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND status = \
         'created' RETURNING *",
    )
    .bind(gateway_order_id)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(s) => {
            trace!("🗃️ Gateway order {gateway_order_id} attached to payment session #{id}");
            Ok(s)
        },
        None => Err(transition_error(id, PaymentStatus::Created, conn).await?),
    }
}

pub async fn mark_session_failed(
    id: i64,
    failure: SessionFailure,
    conn: &mut SqliteConnection,
) -> Result<PaymentSession, PaymentSessionError> {
    let updated: Option<PaymentSession> = sqlx::query_as(
        r#"
            UPDATE payment_sessions SET
                status = 'failed',
                failure_reason = $1,
                gateway_order_id = CASE WHEN $2 THEN NULL ELSE gateway_order_id END,
                gateway_payment_id = COALESCE($3, gateway_payment_id),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $4 AND status = 'created'
            RETURNING *;
        "#,
    )
    .bind(&failure.reason)
    .bind(failure.clear_order_id)
    .bind(failure.gateway_payment_id)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(s) => {
            debug!("🗃️ Payment session #{id} marked as failed: {}", failure.reason);
            Ok(s)
        },
        None => Err(transition_error(id, PaymentStatus::Failed, conn).await?),
    }
}

async fn mark_enrollment_paid(
    enrollment_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Enrollment, PaymentSessionError> {
    let before = enrollments::fetch_enrollment(enrollment_id, &mut *conn)
        .await?
        .ok_or(PaymentSessionError::EnrollmentNotFound(enrollment_id))?;
    if before.status == EnrollmentStatus::Cancelled {
        warn!("🗃️ Enrollment #{enrollment_id} was cancelled but has now been paid for. Marking it as paid.");
    }
    enrollments::update_status(enrollment_id, EnrollmentStatus::Paid, conn)
        .await?
        .ok_or(PaymentSessionError::EnrollmentNotFound(enrollment_id))
}

async fn session_enrollment(
    session: &PaymentSession,
    conn: &mut SqliteConnection,
) -> Result<Option<Enrollment>, PaymentSessionError> {
    match session.enrollment_id {
        Some(enrollment_id) => {
            let enrollment = enrollments::fetch_enrollment(enrollment_id, conn)
                .await?
                .ok_or(PaymentSessionError::EnrollmentNotFound(enrollment_id))?;
            Ok(Some(enrollment))
        },
        None => Ok(None),
    }
}

/// Marks the session and its enrollment as paid. This is not atomic on its own; call it with a transaction.
pub async fn settle_session(
    id: i64,
    details: SettlementDetails,
    conn: &mut SqliteConnection,
) -> Result<(PaymentSession, Option<Enrollment>), PaymentSessionError> {
    let session = fetch_session(id, &mut *conn).await?.ok_or(PaymentSessionError::SessionNotFound(id))?;
    match session.status {
        PaymentStatus::Created => {},
        PaymentStatus::Paid if session.gateway_payment_id.as_deref() == Some(details.gateway_payment_id.as_str()) => {
            debug!("🗃️ Payment session #{id} is already settled with {}", details.gateway_payment_id);
            let enrollment = session_enrollment(&session, conn).await?;
            return Ok((session, enrollment));
        },
        from => return Err(PaymentSessionError::InvalidTransition { id, from, to: PaymentStatus::Paid }),
    }
    ensure_payment_unrecorded(Some(id), &details.gateway_payment_id, &mut *conn).await?;
    let session: PaymentSession = sqlx::query_as(
        r#"
            UPDATE payment_sessions SET
                status = 'paid',
                gateway_order_id = $1,
                gateway_payment_id = $2,
                gateway_signature = COALESCE($3, gateway_signature),
                failure_reason = NULL,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $4
            RETURNING *;
        "#,
    )
    .bind(details.gateway_order_id)
    .bind(details.gateway_payment_id)
    .bind(details.gateway_signature)
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;
    let enrollment = match session.enrollment_id {
        Some(enrollment_id) => Some(mark_enrollment_paid(enrollment_id, conn).await?),
        None => None,
    };
    debug!("🗃️ Payment session #{id} settled");
    Ok((session, enrollment))
}

/// Records a paid session for a payment that had no matching session. Superseded `created` sessions of the enrollment
/// are failed first so that the new session does not trip the live-session index. Without an enrollment, only the
/// session is recorded. Call it with a transaction.
pub async fn insert_settled_session(
    enrollment_id: Option<i64>,
    amount: MinorUnits,
    currency: &str,
    details: SettlementDetails,
    conn: &mut SqliteConnection,
) -> Result<(PaymentSession, Option<Enrollment>), PaymentSessionError> {
    ensure_payment_unrecorded(None, &details.gateway_payment_id, &mut *conn).await?;
    let Some(enrollment_id) = enrollment_id else {
        let session = insert(None, amount, currency, PaymentStatus::Paid, Some(&details), conn).await?;
        warn!("🗃️ Paid session #{} recorded without an enrollment", session.id);
        return Ok((session, None));
    };
    if enrollments::fetch_enrollment(enrollment_id, &mut *conn).await?.is_none() {
        return Err(PaymentSessionError::EnrollmentNotFound(enrollment_id));
    }
    let superseded = sqlx::query(
        "UPDATE payment_sessions SET status = 'failed', failure_reason = $1, updated_at = CURRENT_TIMESTAMP WHERE \
         enrollment_id = $2 AND status = 'created'",
    )
    .bind(format!("Superseded by payment {}", details.gateway_payment_id))
    .bind(enrollment_id)
    .execute(&mut *conn)
    .await?
    .rows_affected();
    if superseded > 0 {
        debug!("🗃️ {superseded} open payment session(s) for enrollment #{enrollment_id} superseded");
    }
    let session = insert(Some(enrollment_id), amount, currency, PaymentStatus::Paid, Some(&details), &mut *conn).await?;
    let enrollment = mark_enrollment_paid(enrollment_id, conn).await?;
    debug!("🗃️ Paid session #{} recorded for enrollment #{enrollment_id}", session.id);
    Ok((session, Some(enrollment)))
}
