use std::{fmt::Display, str::FromStr};

pub use academy_common::{MinorUnits, DEFAULT_CURRENCY_CODE};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{types::Json, FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(String);

//--------------------------------------     CourseType       ---------------------------------------------------------
/// The kind of catalog entry a learner enrolls in. Catalog items use the same set of kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CourseType {
    SkillPath,
    CareerPath,
    Course,
}

impl Display for CourseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SkillPath => write!(f, "skillpath"),
            Self::CareerPath => write!(f, "careerpath"),
            Self::Course => write!(f, "course"),
        }
    }
}

impl FromStr for CourseType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skillpath" => Ok(Self::SkillPath),
            "careerpath" => Ok(Self::CareerPath),
            "course" => Ok(Self::Course),
            s => Err(ConversionError(format!("{s} is not a valid course type"))),
        }
    }
}

/// Catalog items are partitioned by the same kinds that enrollments refer to.
pub type CatalogKind = CourseType;

//--------------------------------------   EnrollmentStatus     -------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    /// Created, awaiting payment.
    #[default]
    Pending,
    /// A verified payment has been recorded against the enrollment.
    Paid,
    /// Cancelled by an administrator.
    Cancelled,
}

impl Display for EnrollmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Paid => write!(f, "paid"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for EnrollmentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("{s} is not a valid enrollment status"))),
        }
    }
}

//--------------------------------------     PaymentStatus      -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Created,
    Paid,
    Failed,
    /// Reserved. Nothing transitions a session into this state yet.
    Refunded,
}

impl PaymentStatus {
    /// `created` and `paid` sessions count towards the one-active-session-per-enrollment rule.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Created | Self::Paid)
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Paid => write!(f, "paid"),
            Self::Failed => write!(f, "failed"),
            Self::Refunded => write!(f, "refunded"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            s => Err(ConversionError(format!("{s} is not a valid payment status"))),
        }
    }
}

//--------------------------------------        Role            -------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Instructor,
    Admin,
}

/// Determines the prefix of a user's registration number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleCategory {
    Student,
    Staff,
}

impl RoleCategory {
    pub fn urn_prefix(&self) -> &'static str {
        match self {
            Self::Student => "STD",
            Self::Staff => "INS",
        }
    }
}

impl Role {
    pub fn category(&self) -> RoleCategory {
        match self {
            Self::Student => RoleCategory::Student,
            Self::Instructor | Self::Admin => RoleCategory::Staff,
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Student => write!(f, "student"),
            Self::Instructor => write!(f, "instructor"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Self::Student),
            "instructor" => Ok(Self::Instructor),
            "admin" => Ok(Self::Admin),
            s => Err(ConversionError(format!("{s} is not a valid role"))),
        }
    }
}

//--------------------------------------      Enrollment        -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: i64,
    pub user_email: String,
    pub course_type: CourseType,
    pub course_slug: String,
    pub status: EnrollmentStatus,
    /// Price in major currency units, as captured at checkout.
    pub amount: Option<f64>,
    pub currency: String,
    pub meta: Json<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEnrollment {
    pub user_email: String,
    pub course_type: CourseType,
    pub course_slug: String,
    #[serde(default)]
    pub status: EnrollmentStatus,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "empty_object")]
    pub meta: Value,
}

impl NewEnrollment {
    pub fn new<S: Into<String>>(user_email: S, course_type: CourseType, course_slug: S) -> Self {
        Self {
            user_email: user_email.into(),
            course_type,
            course_slug: course_slug.into(),
            status: EnrollmentStatus::Pending,
            amount: None,
            currency: DEFAULT_CURRENCY_CODE.to_string(),
            meta: empty_object(),
        }
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_currency<S: Into<String>>(mut self, currency: S) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = meta;
        self
    }
}

fn default_currency() -> String {
    DEFAULT_CURRENCY_CODE.to_string()
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

//--------------------------------------    PaymentSession      -------------------------------------------------------
/// One attempt to collect payment for an enrollment through the gateway.
///
/// `enrollment_id` is only empty for a verified payment that arrived without any way to tell which enrollment it was
/// for.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSession {
    pub id: i64,
    pub enrollment_id: Option<i64>,
    pub amount: MinorUnits,
    pub currency: String,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub gateway_signature: Option<String>,
    pub status: PaymentStatus,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPaymentSession {
    pub enrollment_id: i64,
    pub amount: MinorUnits,
    pub currency: String,
}

/// The gateway's confirmation of a completed payment. It is written onto a session when it is settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementDetails {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub gateway_signature: Option<String>,
}

/// What gets recorded against a session that did not complete.
///
/// The session's gateway order id is never replaced here. Unverified gateway values belong in `reason`.
#[derive(Debug, Clone, Default)]
pub struct SessionFailure {
    pub reason: String,
    /// When `true` the gateway order id is cleared, so the session can never be matched against a later payment.
    pub clear_order_id: bool,
    /// The gateway's id for the failed payment. Only set from an authenticated gateway notification.
    pub gateway_payment_id: Option<String>,
}

//--------------------------------------      CatalogItem       -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: i64,
    pub kind: CatalogKind,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub currency: String,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCatalogItem {
    pub kind: CatalogKind,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub published: bool,
}

/// A partial update to a catalog item. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItemUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub published: Option<bool>,
    /// Set by the catalog API when the title changes. Not accepted from clients.
    #[serde(skip)]
    pub slug: Option<String>,
}

impl CatalogItemUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() &&
            self.description.is_none() &&
            self.price.is_none() &&
            self.currency.is_none() &&
            self.published.is_none() &&
            self.slug.is_none()
    }
}

//--------------------------------------         User           -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub registration_number: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub role: Role,
    pub registration_number: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct EmailVerificationToken {
    pub token: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
