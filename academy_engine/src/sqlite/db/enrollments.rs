use log::{debug, trace};
use sqlx::{types::Json, QueryBuilder, SqliteConnection};

use crate::{
    db_types::{Enrollment, EnrollmentStatus, NewEnrollment},
    traits::{EnrollmentError, EnrollmentQueryFilter},
};

pub async fn insert_enrollment(
    enrollment: NewEnrollment,
    conn: &mut SqliteConnection,
) -> Result<Enrollment, EnrollmentError> {
    let NewEnrollment { user_email, course_type, course_slug, status, amount, currency, meta } = enrollment;
    let result: Result<Enrollment, sqlx::Error> = sqlx::query_as(
        r#"
            INSERT INTO enrollments (user_email, course_type, course_slug, status, amount, currency, meta)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(&user_email)
    .bind(course_type)
    .bind(&course_slug)
    .bind(status)
    .bind(amount)
    .bind(currency)
    .bind(Json(meta))
    .fetch_one(conn)
    .await;
    match result {
        Ok(e) => {
            debug!("🗃️ Enrollment #{} created for {} in {} '{}'", e.id, e.user_email, e.course_type, e.course_slug);
            Ok(e)
        },
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
            Err(EnrollmentError::AlreadyExists { email: user_email, course_type, course_slug })
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_enrollment(id: i64, conn: &mut SqliteConnection) -> Result<Option<Enrollment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM enrollments WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_enrollments_for_user(
    email: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<Enrollment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM enrollments WHERE user_email = $1 ORDER BY created_at DESC, id DESC")
        .bind(email)
        .fetch_all(conn)
        .await
}

/// Fetches enrollments matching the filter, newest first.
pub async fn search_enrollments(
    query: EnrollmentQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<Enrollment>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM enrollments ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(status) = query.status {
        where_clause.push("status = ");
        where_clause.push_bind_unseparated(status.to_string());
    }
    if let Some(course_type) = query.course_type {
        where_clause.push("course_type = ");
        where_clause.push_bind_unseparated(course_type.to_string());
    }
    if let Some(email) = query.user_email {
        where_clause.push("user_email = ");
        where_clause.push_bind_unseparated(email);
    }
    builder.push(" ORDER BY created_at DESC, id DESC");
    trace!("🗃️ Executing query: {}", builder.sql());
    let enrollments = builder.build_query_as::<Enrollment>().fetch_all(conn).await?;
    trace!("🗃️ {} enrollments matched", enrollments.len());
    Ok(enrollments)
}

/// Sets the status of an enrollment unconditionally. Returns `None` if the enrollment does not exist.
pub(crate) async fn update_status(
    id: i64,
    status: EnrollmentStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Enrollment>, sqlx::Error> {
    sqlx::query_as("UPDATE enrollments SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
        .bind(status)
        .bind(id)
        .fetch_optional(conn)
        .await
}

/// Only pending enrollments can be cancelled.
pub async fn cancel_enrollment(id: i64, conn: &mut SqliteConnection) -> Result<Enrollment, EnrollmentError> {
    let cancelled: Option<Enrollment> = sqlx::query_as(
        "UPDATE enrollments SET status = 'cancelled', updated_at = CURRENT_TIMESTAMP WHERE id = $1 AND status = \
         'pending' RETURNING *",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    match cancelled {
        Some(e) => {
            debug!("🗃️ Enrollment #{id} cancelled");
            Ok(e)
        },
        None => match fetch_enrollment(id, conn).await? {
            Some(e) => Err(EnrollmentError::InvalidState { id, status: e.status, action: "cancelled" }),
            None => Err(EnrollmentError::NotFound(id)),
        },
    }
}
