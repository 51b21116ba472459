use academy_engine::{
    db_types::{
        CatalogItem,
        CatalogItemUpdate,
        CatalogKind,
        Enrollment,
        MinorUnits,
        NewCatalogItem,
        NewEnrollment,
        NewPaymentSession,
        NewUser,
        PaymentSession,
        SessionFailure,
        SettlementDetails,
        User,
    },
    traits::{
        CatalogError,
        CatalogManagement,
        EnrollmentError,
        EnrollmentManagement,
        EnrollmentQueryFilter,
        IdentifierError,
        IdentifierLookup,
        PaymentSessionError,
        PaymentSessionManagement,
        UserApiError,
        UserManagement,
    },
};
use chrono::{DateTime, Utc};
use mockall::mock;

mock! {
    pub CheckoutStore {}
    impl EnrollmentManagement for CheckoutStore {
        async fn insert_enrollment(&self, enrollment: NewEnrollment) -> Result<Enrollment, EnrollmentError>;
        async fn fetch_enrollment(&self, id: i64) -> Result<Option<Enrollment>, EnrollmentError>;
        async fn fetch_enrollments_for_user(&self, email: &str) -> Result<Vec<Enrollment>, EnrollmentError>;
        async fn search_enrollments(&self, query: EnrollmentQueryFilter) -> Result<Vec<Enrollment>, EnrollmentError>;
        async fn cancel_enrollment(&self, id: i64) -> Result<Enrollment, EnrollmentError>;
    }
    impl PaymentSessionManagement for CheckoutStore {
        async fn fetch_active_session(&self, enrollment_id: i64) -> Result<Option<PaymentSession>, PaymentSessionError>;
        async fn insert_session(&self, session: NewPaymentSession) -> Result<PaymentSession, PaymentSessionError>;
        async fn attach_gateway_order(&self, session_id: i64, gateway_order_id: &str) -> Result<PaymentSession, PaymentSessionError>;
        async fn mark_session_failed(&self, session_id: i64, failure: SessionFailure) -> Result<PaymentSession, PaymentSessionError>;
        async fn fetch_session(&self, session_id: i64) -> Result<Option<PaymentSession>, PaymentSessionError>;
        async fn fetch_session_by_gateway_order(&self, gateway_order_id: &str) -> Result<Option<PaymentSession>, PaymentSessionError>;
        async fn fetch_paid_session_by_gateway_payment(&self, gateway_payment_id: &str) -> Result<Option<PaymentSession>, PaymentSessionError>;
        async fn fetch_sessions_for_enrollment(&self, enrollment_id: i64) -> Result<Vec<PaymentSession>, PaymentSessionError>;
        async fn settle_session(&self, session_id: i64, details: SettlementDetails) -> Result<(PaymentSession, Option<Enrollment>), PaymentSessionError>;
        async fn insert_settled_session(&self, enrollment_id: Option<i64>, amount: MinorUnits, currency: &str, details: SettlementDetails) -> Result<(PaymentSession, Option<Enrollment>), PaymentSessionError>;
    }
}

mock! {
    pub UserStore {}
    impl UserManagement for UserStore {
        async fn insert_user(&self, user: NewUser) -> Result<User, UserApiError>;
        async fn fetch_user(&self, id: i64) -> Result<Option<User>, UserApiError>;
        async fn fetch_user_by_email(&self, email: &str) -> Result<Option<User>, UserApiError>;
        async fn insert_verification_token(&self, user_id: i64, token: &str, expires_at: DateTime<Utc>) -> Result<(), UserApiError>;
        async fn consume_verification_token(&self, token: &str, now: DateTime<Utc>) -> Result<User, UserApiError>;
    }
    impl IdentifierLookup for UserStore {
        async fn slug_exists(&self, kind: CatalogKind, slug: &str, exclude_id: Option<i64>) -> Result<bool, IdentifierError>;
        async fn registration_number_exists(&self, registration_number: &str) -> Result<bool, IdentifierError>;
    }
}

mock! {
    pub CatalogStore {}
    impl CatalogManagement for CatalogStore {
        async fn insert_catalog_item(&self, item: NewCatalogItem, slug: &str) -> Result<CatalogItem, CatalogError>;
        async fn fetch_catalog_item(&self, id: i64) -> Result<Option<CatalogItem>, CatalogError>;
        async fn fetch_catalog_item_by_slug(&self, kind: CatalogKind, slug: &str) -> Result<Option<CatalogItem>, CatalogError>;
        async fn fetch_catalog(&self, kind: CatalogKind, published_only: bool) -> Result<Vec<CatalogItem>, CatalogError>;
        async fn update_catalog_item(&self, id: i64, update: CatalogItemUpdate) -> Result<CatalogItem, CatalogError>;
    }
    impl IdentifierLookup for CatalogStore {
        async fn slug_exists(&self, kind: CatalogKind, slug: &str, exclude_id: Option<i64>) -> Result<bool, IdentifierError>;
        async fn registration_number_exists(&self, registration_number: &str) -> Result<bool, IdentifierError>;
    }
}
