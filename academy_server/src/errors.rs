use academy_engine::{
    traits::{CatalogError, EnrollmentError, PaymentSessionError, UserApiError},
    CheckoutError,
};
use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::error;
use thiserror::Error;

/// The only message clients ever see for a server-side failure. The details are logged.
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred.";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("Could not issue access token. {0}")]
    CouldNotIssueAccessToken(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("{0}")]
    GatewayError(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::InvalidState(_) => StatusCode::BAD_REQUEST,
            Self::GatewayError(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
                AuthError::PoorlyFormattedToken(_) => StatusCode::BAD_REQUEST,
                AuthError::InvalidSignature(_) => StatusCode::FORBIDDEN,
            },
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::CouldNotIssueAccessToken(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = if status.is_server_error() {
            error!("💻️ Request failed with {status}. {self}");
            INTERNAL_ERROR_MESSAGE.to_string()
        } else {
            self.to_string()
        };
        HttpResponse::build(status)
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": message }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No access token was found in the request.")]
    MissingToken,
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("Access token is invalid. {0}")]
    ValidationError(String),
    #[error("Access token is not in the correct format. {0}")]
    PoorlyFormattedToken(String),
    #[error("Invalid e-mail address or password")]
    InvalidCredentials,
    #[error("Request signature is invalid. {0}")]
    InvalidSignature(String),
}

/// Checkout requests name their enrollment or session in the body, so an unknown id is a bad request, not a 404.
impl From<CheckoutError> for ServerError {
    fn from(e: CheckoutError) -> Self {
        match e {
            CheckoutError::InvalidInput(_) |
            CheckoutError::EnrollmentNotFound(_) |
            CheckoutError::SessionNotFound(_) => Self::InvalidRequestBody(e.to_string()),
            CheckoutError::InvalidState(s) => Self::InvalidState(s),
            CheckoutError::GatewayError(g) => Self::GatewayError(g.client_message()),
            CheckoutError::SignatureMismatch => Self::InvalidState(e.to_string()),
            CheckoutError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
        }
    }
}

impl From<EnrollmentError> for ServerError {
    fn from(e: EnrollmentError) -> Self {
        match e {
            EnrollmentError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
            EnrollmentError::AlreadyExists { .. } => Self::Conflict(e.to_string()),
            EnrollmentError::NotFound(_) => Self::NoRecordFound(e.to_string()),
            EnrollmentError::InvalidInput(_) => Self::InvalidRequestBody(e.to_string()),
            EnrollmentError::InvalidState { .. } => Self::InvalidState(e.to_string()),
        }
    }
}

impl From<PaymentSessionError> for ServerError {
    fn from(e: PaymentSessionError) -> Self {
        match e {
            PaymentSessionError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
            PaymentSessionError::SessionNotFound(_) | PaymentSessionError::EnrollmentNotFound(_) => {
                Self::NoRecordFound(e.to_string())
            },
            PaymentSessionError::DuplicateActiveSession(_) |
            PaymentSessionError::InvalidTransition { .. } |
            PaymentSessionError::PaymentAlreadyRecorded { .. } => Self::InvalidState(e.to_string()),
        }
    }
}

impl From<CatalogError> for ServerError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
            CatalogError::NotFound(_) | CatalogError::SlugNotFound(_, _) => Self::NoRecordFound(e.to_string()),
            CatalogError::SlugTaken(_) => Self::Conflict(e.to_string()),
            CatalogError::InvalidInput(_) | CatalogError::NoOp => Self::InvalidRequestBody(e.to_string()),
            CatalogError::Forbidden(s) => Self::InsufficientPermissions(s),
        }
    }
}

impl From<UserApiError> for ServerError {
    fn from(e: UserApiError) -> Self {
        match e {
            UserApiError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
            UserApiError::PasswordHashError(s) => Self::BackendError(format!("Password hashing failed: {s}")),
            UserApiError::EmailTaken | UserApiError::RegistrationNumberTaken(_) => Self::Conflict(e.to_string()),
            UserApiError::UserNotFound(_) => Self::NoRecordFound(e.to_string()),
            UserApiError::InvalidCredentials => Self::AuthenticationError(AuthError::InvalidCredentials),
            UserApiError::TokenInvalid | UserApiError::TokenExpired | UserApiError::InvalidInput(_) => {
                Self::InvalidRequestBody(e.to_string())
            },
        }
    }
}
