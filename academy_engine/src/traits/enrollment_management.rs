use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::{CourseType, Enrollment, EnrollmentStatus, NewEnrollment};

#[derive(Debug, Clone, Error)]
pub enum EnrollmentError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("{email} is already enrolled in {course_type} '{course_slug}'")]
    AlreadyExists { email: String, course_type: CourseType, course_slug: String },
    #[error("Enrollment {0} does not exist")]
    NotFound(i64),
    #[error("Invalid enrollment request: {0}")]
    InvalidInput(String),
    #[error("Enrollment {id} is {status} and cannot be {action}")]
    InvalidState { id: i64, status: EnrollmentStatus, action: &'static str },
}

impl From<sqlx::Error> for EnrollmentError {
    fn from(e: sqlx::Error) -> Self {
        EnrollmentError::DatabaseError(e.to_string())
    }
}

/// Search criteria for the admin enrollment listing. Empty fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrollmentQueryFilter {
    #[serde(default)]
    pub status: Option<EnrollmentStatus>,
    #[serde(default)]
    pub course_type: Option<CourseType>,
    #[serde(default)]
    pub user_email: Option<String>,
}

impl EnrollmentQueryFilter {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.course_type.is_none() && self.user_email.is_none()
    }

    pub fn with_status(mut self, status: EnrollmentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_course_type(mut self, course_type: CourseType) -> Self {
        self.course_type = Some(course_type);
        self
    }

    pub fn with_user_email<S: Into<String>>(mut self, email: S) -> Self {
        self.user_email = Some(email.into());
        self
    }
}

#[allow(async_fn_in_trait)]
pub trait EnrollmentManagement {
    /// Stores a new enrollment. Returns [`EnrollmentError::AlreadyExists`] if the learner is already enrolled in the
    /// same course.
    async fn insert_enrollment(&self, enrollment: NewEnrollment) -> Result<Enrollment, EnrollmentError>;

    async fn fetch_enrollment(&self, id: i64) -> Result<Option<Enrollment>, EnrollmentError>;

    /// All enrollments for the given e-mail address, newest first.
    async fn fetch_enrollments_for_user(&self, email: &str) -> Result<Vec<Enrollment>, EnrollmentError>;

    async fn search_enrollments(&self, query: EnrollmentQueryFilter) -> Result<Vec<Enrollment>, EnrollmentError>;

    /// Moves a `pending` enrollment to `cancelled`. Any other starting state is rejected with
    /// [`EnrollmentError::InvalidState`].
    async fn cancel_enrollment(&self, id: i64) -> Result<Enrollment, EnrollmentError>;
}
