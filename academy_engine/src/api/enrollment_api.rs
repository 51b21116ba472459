//! Creates and queries enrollments, and the payment sessions recorded against them.

use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Enrollment, NewEnrollment, PaymentSession},
    traits::{EnrollmentError, EnrollmentManagement, EnrollmentQueryFilter, PaymentSessionError, PaymentSessionManagement},
};

pub struct EnrollmentApi<B> {
    db: B,
}

impl<B: Debug> Debug for EnrollmentApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EnrollmentApi ({:?})", self.db)
    }
}

impl<B> EnrollmentApi<B>
where B: EnrollmentManagement + PaymentSessionManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Validates and stores a new enrollment. A second enrollment for the same learner and course is rejected with
    /// [`EnrollmentError::AlreadyExists`].
    pub async fn create_enrollment(&self, mut enrollment: NewEnrollment) -> Result<Enrollment, EnrollmentError> {
        enrollment.user_email = enrollment.user_email.trim().to_lowercase();
        enrollment.course_slug = enrollment.course_slug.trim().to_string();
        enrollment.currency = enrollment.currency.trim().to_uppercase();
        validate(&enrollment)?;
        let result = self.db.insert_enrollment(enrollment).await?;
        info!(
            "💳️ New enrollment #{} for {} in {} '{}'",
            result.id, result.user_email, result.course_type, result.course_slug
        );
        Ok(result)
    }

    pub async fn fetch_enrollment(&self, id: i64) -> Result<Option<Enrollment>, EnrollmentError> {
        self.db.fetch_enrollment(id).await
    }

    /// All the enrollments for the given learner, newest first.
    pub async fn enrollments_for_user(&self, email: &str) -> Result<Vec<Enrollment>, EnrollmentError> {
        self.db.fetch_enrollments_for_user(email.trim().to_lowercase().as_str()).await
    }

    pub async fn search_enrollments(&self, query: EnrollmentQueryFilter) -> Result<Vec<Enrollment>, EnrollmentError> {
        trace!("Searching enrollments: {query:?}");
        self.db.search_enrollments(query).await
    }

    /// Cancels a pending enrollment. Paid enrollments cannot be cancelled here; refunds go through the gateway.
    pub async fn cancel_enrollment(&self, id: i64) -> Result<Enrollment, EnrollmentError> {
        let enrollment = self.db.cancel_enrollment(id).await?;
        info!("💳️ Enrollment #{id} cancelled");
        Ok(enrollment)
    }

    pub async fn payments_for_enrollment(&self, id: i64) -> Result<Vec<PaymentSession>, PaymentSessionError> {
        self.db.fetch_sessions_for_enrollment(id).await
    }
}

fn validate(enrollment: &NewEnrollment) -> Result<(), EnrollmentError> {
    let email = enrollment.user_email.as_str();
    if email.is_empty() {
        return Err(EnrollmentError::InvalidInput("userEmail is required".into()));
    }
    match email.split_once('@') {
        Some((user, domain)) if !user.is_empty() && !domain.is_empty() => {},
        _ => return Err(EnrollmentError::InvalidInput(format!("{email} is not a valid e-mail address"))),
    }
    if enrollment.course_slug.is_empty() {
        return Err(EnrollmentError::InvalidInput("courseSlug is required".into()));
    }
    if let Some(amount) = enrollment.amount {
        if !amount.is_finite() || amount < 0.0 {
            return Err(EnrollmentError::InvalidInput(format!("{amount} is not a valid amount")));
        }
    }
    if enrollment.currency.is_empty() {
        return Err(EnrollmentError::InvalidInput("currency cannot be empty".into()));
    }
    Ok(())
}
