use std::fmt::Debug;

use academy_common::Secret;
use log::*;
use serde_json::json;

use crate::{
    api::{
        checkout_objects::{CreateOrderResponse, GatewayPaymentEvent, VerifyPaymentRequest, VerifyPaymentResponse},
        errors::CheckoutError,
    },
    db_types::{
        Enrollment,
        EnrollmentStatus,
        MinorUnits,
        NewPaymentSession,
        DEFAULT_CURRENCY_CODE,
        PaymentSession,
        PaymentStatus,
        SessionFailure,
        SettlementDetails,
    },
    helpers::verify_payment_signature,
    traits::{EnrollmentManagement, GatewayOrderRequest, PaymentGateway, PaymentSessionError, PaymentSessionManagement},
};

/// The gateway rejects receipts longer than this.
pub const MAX_RECEIPT_LEN: usize = 40;

/// `CheckoutApi` drives the payment handshake between an enrollment, its payment session and the gateway.
///
/// 1. [`Self::create_order`] finds or creates the live session for an enrollment and asks the gateway for an order.
/// 2. The browser completes the payment with the gateway and receives a signed `(order id, payment id)` pair.
/// 3. [`Self::verify_payment`] checks that signature with the key secret and settles the session and enrollment.
///
/// The webhook handlers [`Self::payment_captured`] and [`Self::payment_failed`] reconcile the same sessions from the
/// gateway's side.
pub struct CheckoutApi<B, G> {
    db: B,
    gateway: G,
    key_secret: Secret<String>,
}

impl<B: Debug, G> Debug for CheckoutApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi ({:?})", self.db)
    }
}

impl<B, G> CheckoutApi<B, G> {
    pub fn new(db: B, gateway: G, key_secret: Secret<String>) -> Self {
        Self { db, gateway, key_secret }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }
}

/// `rcpt_{last 8 digits of the enrollment id}_{last 8 digits of the session id}`
pub fn receipt_for(enrollment_id: i64, session_id: i64) -> String {
    fn last8(id: i64) -> String {
        let s = id.to_string();
        s[s.len().saturating_sub(8)..].to_string()
    }
    let mut receipt = format!("rcpt_{}_{}", last8(enrollment_id), last8(session_id));
    receipt.truncate(MAX_RECEIPT_LEN);
    receipt
}

fn payable_amount(enrollment: &Enrollment) -> Result<MinorUnits, CheckoutError> {
    let invalid = || CheckoutError::InvalidState(format!("Enrollment {} does not have a payable amount", enrollment.id));
    let amount = enrollment.amount.filter(|a| a.is_finite() && *a > 0.0).ok_or_else(invalid)?;
    let minor = MinorUnits::from_major(amount).map_err(|_| invalid())?;
    if minor.is_positive() {
        Ok(minor)
    } else {
        Err(invalid())
    }
}

fn required(field: &Option<String>) -> Option<String> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(String::from)
}

/// What to do with the live session found for an enrollment.
enum SessionChoice {
    /// It already has a gateway order. Hand it back unchanged.
    Reuse(PaymentSession),
    /// It has no gateway order yet. Request one.
    NeedsOrder(PaymentSession),
}

impl<B, G> CheckoutApi<B, G>
where
    B: EnrollmentManagement + PaymentSessionManagement,
    G: PaymentGateway,
{
    /// Creates (or re-issues) a gateway order for the enrollment.
    ///
    /// If the enrollment already has a `created` session with a gateway order, that order is returned as is. A
    /// `created` session without an order (the process died between the two writes) is reused and a new gateway order
    /// is requested for it. Otherwise, a new session is created.
    ///
    /// On a gateway failure the session is marked `failed` so that the next attempt starts cleanly.
    pub async fn create_order(&self, enrollment_id: i64) -> Result<CreateOrderResponse, CheckoutError> {
        let enrollment =
            self.db.fetch_enrollment(enrollment_id).await?.ok_or(CheckoutError::EnrollmentNotFound(enrollment_id))?;
        match enrollment.status {
            EnrollmentStatus::Pending => {},
            EnrollmentStatus::Paid => {
                return Err(CheckoutError::InvalidState(format!("Enrollment {enrollment_id} has already been paid")))
            },
            EnrollmentStatus::Cancelled => {
                return Err(CheckoutError::InvalidState(format!("Enrollment {enrollment_id} has been cancelled")))
            },
        }
        let amount = payable_amount(&enrollment)?;
        let session = match self.choose_session(&enrollment, amount).await? {
            SessionChoice::Reuse(session) => {
                debug!("💳️ Reusing payment session #{} for enrollment #{enrollment_id}", session.id);
                return self.order_response(session);
            },
            SessionChoice::NeedsOrder(session) => session,
        };
        let request = GatewayOrderRequest {
            amount: session.amount,
            currency: session.currency.clone(),
            receipt: receipt_for(enrollment_id, session.id),
            notes: Some(json!({
                "enrollmentId": enrollment_id.to_string(),
                "paymentSessionId": session.id.to_string(),
                "userEmail": enrollment.user_email,
            })),
        };
        match self.gateway.create_order(request).await {
            Ok(order) => {
                let session = self.db.attach_gateway_order(session.id, &order.id).await?;
                info!("💳️ Gateway order {} created for enrollment #{enrollment_id} ({})", order.id, session.amount);
                self.order_response(session)
            },
            Err(e) => {
                warn!("💳️ Gateway refused to create an order for enrollment #{enrollment_id}: {e}");
                let failure =
                    SessionFailure { reason: e.client_message(), clear_order_id: true, ..Default::default() };
                if let Err(e2) = self.db.mark_session_failed(session.id, failure).await {
                    error!("💳️ Could not mark payment session #{} as failed: {e2}", session.id);
                }
                Err(e.into())
            },
        }
    }

    async fn choose_session(&self, enrollment: &Enrollment, amount: MinorUnits) -> Result<SessionChoice, CheckoutError> {
        if let Some(session) = self.db.fetch_active_session(enrollment.id).await? {
            return Self::classify(enrollment.id, session);
        }
        let new_session =
            NewPaymentSession { enrollment_id: enrollment.id, amount, currency: enrollment.currency.clone() };
        match self.db.insert_session(new_session).await {
            Ok(session) => Ok(SessionChoice::NeedsOrder(session)),
            Err(PaymentSessionError::DuplicateActiveSession(id)) => {
                debug!("💳️ Another request created a session for enrollment #{id} first. Using that one.");
                let session = self.db.fetch_active_session(id).await?.ok_or_else(|| {
                    CheckoutError::DatabaseError(format!("Active payment session for enrollment {id} disappeared"))
                })?;
                Self::classify(id, session)
            },
            Err(e) => Err(e.into()),
        }
    }

    fn classify(enrollment_id: i64, session: PaymentSession) -> Result<SessionChoice, CheckoutError> {
        match (session.status, &session.gateway_order_id) {
            (PaymentStatus::Paid, _) => {
                Err(CheckoutError::InvalidState(format!("Enrollment {enrollment_id} has already been paid")))
            },
            (_, Some(_)) => Ok(SessionChoice::Reuse(session)),
            (_, None) => Ok(SessionChoice::NeedsOrder(session)),
        }
    }

    fn order_response(&self, session: PaymentSession) -> Result<CreateOrderResponse, CheckoutError> {
        let order_id = session.gateway_order_id.ok_or_else(|| {
            CheckoutError::DatabaseError(format!("Payment session {} has no gateway order", session.id))
        })?;
        Ok(CreateOrderResponse {
            order_id,
            amount: session.amount,
            currency: session.currency,
            key: self.gateway.key_id().to_string(),
            payment_id: session.id,
        })
    }

    /// Verifies a completed checkout and settles the matching session.
    ///
    /// The session is located through the `paymentId` hint if it refers to a session for the same gateway order, and
    /// otherwise by the gateway order id. If no session matches, a paid session is recorded for the enrollment in the
    /// `enrollmentId` hint, or for no enrollment at all when there is no usable hint. Verifying a payment that has
    /// already been settled returns that session again.
    pub async fn verify_payment(&self, request: VerifyPaymentRequest) -> Result<VerifyPaymentResponse, CheckoutError> {
        let (Some(order_id), Some(payment_id), Some(signature)) = (
            required(&request.razorpay_order_id),
            required(&request.razorpay_payment_id),
            required(&request.razorpay_signature),
        ) else {
            return Err(CheckoutError::InvalidInput(
                "razorpay_order_id, razorpay_payment_id and razorpay_signature are required".into(),
            ));
        };
        if !verify_payment_signature(self.key_secret.reveal(), &order_id, &payment_id, &signature) {
            warn!("💳️ Signature mismatch for gateway order {order_id}, payment {payment_id}");
            if let Some(session_id) = request.payment_id {
                self.record_signature_mismatch(session_id, &order_id, &payment_id, &signature).await;
            }
            return Err(CheckoutError::SignatureMismatch);
        }
        let details = SettlementDetails {
            gateway_order_id: order_id,
            gateway_payment_id: payment_id,
            gateway_signature: Some(signature),
        };
        if let Some(session) = self.recorded_payment(&details).await? {
            debug!("💳️ Payment {} was already recorded against session #{}", details.gateway_payment_id, session.id);
            return Ok(VerifyPaymentResponse::success(session.id));
        }
        let session = self.find_session(request.payment_id, &details.gateway_order_id).await?;
        let settled = match session {
            Some(session) => self.settle(session, details).await?,
            None => self.record_ad_hoc_payment(request.enrollment_id, details).await?,
        };
        info!("💳️ Payment verified. Session #{} is paid", settled.id);
        Ok(VerifyPaymentResponse::success(settled.id))
    }

    /// Fails the hinted session after a forged or corrupted verification, but only if the session belongs to the
    /// claimed gateway order. The unverified values are kept in the failure reason and never replace the session's
    /// own gateway details.
    async fn record_signature_mismatch(&self, session_id: i64, order_id: &str, payment_id: &str, signature: &str) {
        let session = match self.db.fetch_session(session_id).await {
            Ok(Some(s)) if s.gateway_order_id.as_deref() == Some(order_id) => s,
            Ok(_) => {
                debug!("💳️ Payment session #{session_id} is not for gateway order {order_id}. Leaving it alone.");
                return;
            },
            Err(e) => {
                warn!("💳️ Could not fetch payment session #{session_id}: {e}");
                return;
            },
        };
        if session.status != PaymentStatus::Created {
            return;
        }
        let failure = SessionFailure {
            reason: format!("Payment signature verification failed (payment {payment_id}, signature {signature})"),
            ..Default::default()
        };
        if let Err(e) = self.db.mark_session_failed(session.id, failure).await {
            warn!("💳️ Could not record the signature mismatch against payment session #{session_id}: {e}");
        }
    }

    /// A verified payment that already settled a session is answered with that session, provided it was for the same
    /// gateway order.
    async fn recorded_payment(&self, details: &SettlementDetails) -> Result<Option<PaymentSession>, CheckoutError> {
        match self.db.fetch_paid_session_by_gateway_payment(&details.gateway_payment_id).await? {
            Some(s) if s.gateway_order_id.as_deref() == Some(details.gateway_order_id.as_str()) => Ok(Some(s)),
            Some(s) => Err(CheckoutError::InvalidState(format!(
                "Payment {} has already been recorded against payment session {}",
                details.gateway_payment_id, s.id
            ))),
            None => Ok(None),
        }
    }

    /// Records a verified payment that matches no session, against the hinted enrollment when it exists.
    async fn record_ad_hoc_payment(
        &self,
        enrollment_hint: Option<i64>,
        details: SettlementDetails,
    ) -> Result<PaymentSession, CheckoutError> {
        let enrollment = match enrollment_hint {
            Some(id) => {
                let enrollment = self.db.fetch_enrollment(id).await?;
                if enrollment.is_none() {
                    warn!("💳️ Enrollment hint #{id} for gateway order {} does not exist", details.gateway_order_id);
                }
                enrollment
            },
            None => None,
        };
        match &enrollment {
            Some(e) => warn!(
                "💳️ No payment session matches gateway order {}. Recording the payment against enrollment #{}",
                details.gateway_order_id, e.id
            ),
            None => warn!(
                "💳️ No payment session or enrollment matches gateway order {}. Recording payment {} on its own",
                details.gateway_order_id, details.gateway_payment_id
            ),
        }
        let amount = enrollment.as_ref().and_then(|e| payable_amount(e).ok()).unwrap_or_default();
        let currency =
            enrollment.as_ref().map(|e| e.currency.clone()).unwrap_or_else(|| DEFAULT_CURRENCY_CODE.to_string());
        self.record_unmatched_payment(enrollment.map(|e| e.id), amount, &currency, details).await
    }

    async fn find_session(
        &self,
        session_hint: Option<i64>,
        gateway_order_id: &str,
    ) -> Result<Option<PaymentSession>, CheckoutError> {
        if let Some(id) = session_hint {
            match self.db.fetch_session(id).await? {
                Some(s) if s.gateway_order_id.as_deref() == Some(gateway_order_id) => return Ok(Some(s)),
                Some(_) => warn!("💳️ Payment session #{id} does not belong to gateway order {gateway_order_id}"),
                None => debug!("💳️ Payment session hint #{id} does not exist"),
            }
        }
        Ok(self.db.fetch_session_by_gateway_order(gateway_order_id).await?)
    }

    /// Marks the session and its enrollment as paid.
    ///
    /// A session that already failed cannot become paid, so a payment that arrives for it anyway is recorded as a new
    /// paid session for the same enrollment.
    async fn settle(&self, session: PaymentSession, details: SettlementDetails) -> Result<PaymentSession, CheckoutError> {
        match session.status {
            PaymentStatus::Created => {
                let (session, enrollment) = self.db.settle_session(session.id, details).await?;
                if let Some(enrollment) = enrollment {
                    debug!("💳️ Session #{} settled. Enrollment #{} is {}", session.id, enrollment.id, enrollment.status);
                }
                Ok(session)
            },
            PaymentStatus::Paid if session.gateway_payment_id.as_deref() == Some(&details.gateway_payment_id) => {
                debug!("💳️ Payment {} was already recorded against session #{}", details.gateway_payment_id, session.id);
                Ok(session)
            },
            PaymentStatus::Paid => Err(CheckoutError::InvalidState(format!(
                "Payment session {} has already been settled by a different payment",
                session.id
            ))),
            PaymentStatus::Failed | PaymentStatus::Refunded => {
                info!(
                    "💳️ Payment {} arrived for session #{} which is {}. Recording it as a new session.",
                    details.gateway_payment_id, session.id, session.status
                );
                self.record_unmatched_payment(session.enrollment_id, session.amount, &session.currency, details).await
            },
        }
    }

    async fn record_unmatched_payment(
        &self,
        enrollment_id: Option<i64>,
        amount: MinorUnits,
        currency: &str,
        details: SettlementDetails,
    ) -> Result<PaymentSession, CheckoutError> {
        match self.db.insert_settled_session(enrollment_id, amount, currency, details.clone()).await {
            Ok((session, _)) => Ok(session),
            Err(PaymentSessionError::DuplicateActiveSession(id)) => match self.db.fetch_active_session(id).await? {
                Some(s) if s.gateway_payment_id.as_deref() == Some(details.gateway_payment_id.as_str()) => Ok(s),
                _ => Err(CheckoutError::InvalidState(format!("Enrollment {id} has already been paid"))),
            },
            Err(e @ PaymentSessionError::PaymentAlreadyRecorded { .. }) => {
                self.recorded_payment(&details).await?.ok_or_else(|| e.into())
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Handles the gateway's `payment.captured` notification. Returns the settled session, or `None` if the payment
    /// does not belong to any known session.
    pub async fn payment_captured(&self, event: GatewayPaymentEvent) -> Result<Option<PaymentSession>, CheckoutError> {
        let details = SettlementDetails {
            gateway_order_id: event.gateway_order_id.clone(),
            gateway_payment_id: event.gateway_payment_id.clone(),
            gateway_signature: None,
        };
        if let Some(session) = self.recorded_payment(&details).await? {
            debug!("💳️ Captured payment {} was already recorded against session #{}", event.gateway_payment_id, session.id);
            return Ok(Some(session));
        }
        let Some(session) = self.db.fetch_session_by_gateway_order(&event.gateway_order_id).await? else {
            info!("💳️ Captured payment {} is for unknown gateway order {}", event.gateway_payment_id, event.gateway_order_id);
            return Ok(None);
        };
        if event.amount != session.amount {
            warn!(
                "💳️ Captured amount {} for gateway order {} differs from the session amount {}",
                event.amount, event.gateway_order_id, session.amount
            );
        }
        let session = self.settle(session, details).await?;
        Ok(Some(session))
    }

    /// Handles the gateway's `payment.failed` notification by failing the matching `created` session.
    pub async fn payment_failed(&self, event: GatewayPaymentEvent) -> Result<Option<PaymentSession>, CheckoutError> {
        let Some(session) = self.db.fetch_session_by_gateway_order(&event.gateway_order_id).await? else {
            info!("💳️ Failed payment {} is for unknown gateway order {}", event.gateway_payment_id, event.gateway_order_id);
            return Ok(None);
        };
        if session.status != PaymentStatus::Created {
            debug!("💳️ Ignoring failed payment {} for session #{} ({})", event.gateway_payment_id, session.id, session.status);
            return Ok(Some(session));
        }
        let failure = SessionFailure {
            reason: event.failure_description.unwrap_or_else(|| "Payment failed".to_string()),
            clear_order_id: false,
            gateway_payment_id: Some(event.gateway_payment_id),
        };
        let session = self.db.mark_session_failed(session.id, failure).await?;
        Ok(Some(session))
    }
}
