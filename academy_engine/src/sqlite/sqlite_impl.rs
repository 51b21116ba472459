//! `SqliteDatabase` is the concrete storage backend for the academy engine.
//!
//! It implements every storage trait in the [`traits`](crate::traits) module. Operations that touch more than one row
//! in a way that must be atomic (settling a payment, consuming a verification token) run inside a transaction.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqlitePool;

use super::db::{catalog, db_url, enrollments, new_pool, payment_sessions, users};
use crate::{
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

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl EnrollmentManagement for SqliteDatabase {
    async fn insert_enrollment(&self, enrollment: NewEnrollment) -> Result<Enrollment, EnrollmentError> {
        let mut conn = self.pool.acquire().await?;
        enrollments::insert_enrollment(enrollment, &mut conn).await
    }

    async fn fetch_enrollment(&self, id: i64) -> Result<Option<Enrollment>, EnrollmentError> {
        let mut conn = self.pool.acquire().await?;
        let enrollment = enrollments::fetch_enrollment(id, &mut conn).await?;
        Ok(enrollment)
    }

    async fn fetch_enrollments_for_user(&self, email: &str) -> Result<Vec<Enrollment>, EnrollmentError> {
        let mut conn = self.pool.acquire().await?;
        let result = enrollments::fetch_enrollments_for_user(email, &mut conn).await?;
        Ok(result)
    }

    async fn search_enrollments(&self, query: EnrollmentQueryFilter) -> Result<Vec<Enrollment>, EnrollmentError> {
        let mut conn = self.pool.acquire().await?;
        let result = enrollments::search_enrollments(query, &mut conn).await?;
        Ok(result)
    }

    async fn cancel_enrollment(&self, id: i64) -> Result<Enrollment, EnrollmentError> {
        let mut conn = self.pool.acquire().await?;
        enrollments::cancel_enrollment(id, &mut conn).await
    }
}

impl PaymentSessionManagement for SqliteDatabase {
    async fn fetch_active_session(&self, enrollment_id: i64) -> Result<Option<PaymentSession>, PaymentSessionError> {
        let mut conn = self.pool.acquire().await?;
        let session = payment_sessions::fetch_active_session(enrollment_id, &mut conn).await?;
        Ok(session)
    }

    async fn insert_session(&self, session: NewPaymentSession) -> Result<PaymentSession, PaymentSessionError> {
        let mut conn = self.pool.acquire().await?;
        payment_sessions::insert_session(session, &mut conn).await
    }

    async fn attach_gateway_order(
        &self,
        session_id: i64,
        gateway_order_id: &str,
    ) -> Result<PaymentSession, PaymentSessionError> {
        let mut conn = self.pool.acquire().await?;
        payment_sessions::attach_gateway_order(session_id, gateway_order_id, &mut conn).await
    }

    async fn mark_session_failed(
        &self,
        session_id: i64,
        failure: SessionFailure,
    ) -> Result<PaymentSession, PaymentSessionError> {
        let mut conn = self.pool.acquire().await?;
        payment_sessions::mark_session_failed(session_id, failure, &mut conn).await
    }

    async fn fetch_session(&self, session_id: i64) -> Result<Option<PaymentSession>, PaymentSessionError> {
        let mut conn = self.pool.acquire().await?;
        let session = payment_sessions::fetch_session(session_id, &mut conn).await?;
        Ok(session)
    }

    async fn fetch_session_by_gateway_order(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<PaymentSession>, PaymentSessionError> {
        let mut conn = self.pool.acquire().await?;
        let session = payment_sessions::fetch_session_by_gateway_order(gateway_order_id, &mut conn).await?;
        Ok(session)
    }

    async fn fetch_paid_session_by_gateway_payment(
        &self,
        gateway_payment_id: &str,
    ) -> Result<Option<PaymentSession>, PaymentSessionError> {
        let mut conn = self.pool.acquire().await?;
        let session = payment_sessions::fetch_paid_session_by_gateway_payment(gateway_payment_id, &mut conn).await?;
        Ok(session)
    }

    async fn fetch_sessions_for_enrollment(
        &self,
        enrollment_id: i64,
    ) -> Result<Vec<PaymentSession>, PaymentSessionError> {
        let mut conn = self.pool.acquire().await?;
        let sessions = payment_sessions::fetch_sessions_for_enrollment(enrollment_id, &mut conn).await?;
        Ok(sessions)
    }

    async fn settle_session(
        &self,
        session_id: i64,
        details: SettlementDetails,
    ) -> Result<(PaymentSession, Option<Enrollment>), PaymentSessionError> {
        let mut tx = self.pool.begin().await?;
        let result = payment_sessions::settle_session(session_id, details, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn insert_settled_session(
        &self,
        enrollment_id: Option<i64>,
        amount: MinorUnits,
        currency: &str,
        details: SettlementDetails,
    ) -> Result<(PaymentSession, Option<Enrollment>), PaymentSessionError> {
        let mut tx = self.pool.begin().await?;
        let result = payment_sessions::insert_settled_session(enrollment_id, amount, currency, details, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }
}

impl IdentifierLookup for SqliteDatabase {
    async fn slug_exists(
        &self,
        kind: CatalogKind,
        slug: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, IdentifierError> {
        let mut conn = self.pool.acquire().await?;
        let exists = catalog::slug_exists(kind, slug, exclude_id, &mut conn).await?;
        Ok(exists)
    }

    async fn registration_number_exists(&self, registration_number: &str) -> Result<bool, IdentifierError> {
        let mut conn = self.pool.acquire().await?;
        let exists = users::registration_number_exists(registration_number, &mut conn).await?;
        Ok(exists)
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn insert_catalog_item(&self, item: NewCatalogItem, slug: &str) -> Result<CatalogItem, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        catalog::insert_catalog_item(item, slug, &mut conn).await
    }

    async fn fetch_catalog_item(&self, id: i64) -> Result<Option<CatalogItem>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let item = catalog::fetch_catalog_item(id, &mut conn).await?;
        Ok(item)
    }

    async fn fetch_catalog_item_by_slug(
        &self,
        kind: CatalogKind,
        slug: &str,
    ) -> Result<Option<CatalogItem>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let item = catalog::fetch_catalog_item_by_slug(kind, slug, &mut conn).await?;
        Ok(item)
    }

    async fn fetch_catalog(&self, kind: CatalogKind, published_only: bool) -> Result<Vec<CatalogItem>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let items = catalog::fetch_catalog(kind, published_only, &mut conn).await?;
        Ok(items)
    }

    async fn update_catalog_item(&self, id: i64, update: CatalogItemUpdate) -> Result<CatalogItem, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        catalog::update_catalog_item(id, update, &mut conn).await
    }
}

impl UserManagement for SqliteDatabase {
    async fn insert_user(&self, user: NewUser) -> Result<User, UserApiError> {
        let mut conn = self.pool.acquire().await?;
        users::insert_user(user, &mut conn).await
    }

    async fn fetch_user(&self, id: i64) -> Result<Option<User>, UserApiError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::fetch_user(id, &mut conn).await?;
        Ok(user)
    }

    async fn fetch_user_by_email(&self, email: &str) -> Result<Option<User>, UserApiError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::fetch_user_by_email(email, &mut conn).await?;
        Ok(user)
    }

    async fn insert_verification_token(
        &self,
        user_id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), UserApiError> {
        let mut conn = self.pool.acquire().await?;
        users::insert_verification_token(user_id, token, expires_at, &mut conn).await?;
        Ok(())
    }

    async fn consume_verification_token(&self, token: &str, now: DateTime<Utc>) -> Result<User, UserApiError> {
        let mut tx = self.pool.begin().await?;
        let user = users::consume_verification_token(token, now, &mut tx).await?;
        tx.commit().await?;
        Ok(user)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the `ACADEMY_DATABASE_URL` environment variable.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Applies the embedded schema migrations.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    pub async fn close(&mut self) -> Result<(), sqlx::Error> {
        self.pool.close().await;
        Ok(())
    }
}
