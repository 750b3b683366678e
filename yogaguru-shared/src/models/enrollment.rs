/// Enrollment model and database operations
///
/// An enrollment is a student's package on a course. Creating one runs the whole
/// capacity and duplicate check inside a single transaction that holds a row lock
/// on the course, so two students racing for the last seat serialize and only
/// one of them gets it.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE enrollment_type AS ENUM ('pre_session', 'monthly', 'six_month', 'yearly');
///
/// CREATE TABLE enrollments (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id),
///     course_id UUID NOT NULL REFERENCES courses(id),
///     enrollment_type enrollment_type NOT NULL,
///     start_date TIMESTAMPTZ NOT NULL,
///     expiration_date TIMESTAMPTZ NOT NULL,
///     price_paid NUMERIC(14, 4) NOT NULL,
///     discount_applied NUMERIC(4, 2) NOT NULL,
///     total_sessions INTEGER NOT NULL,
///     sessions_used INTEGER NOT NULL DEFAULT 0,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT enrollments_user_course_key UNIQUE (user_id, course_id)
/// );
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::is_unique_violation;
use crate::enrollment::{period, price, EnrollmentError, PackageType};

/// Unique constraint backing the one-enrollment-per-course rule
pub const USER_COURSE_CONSTRAINT: &str = "enrollments_user_course_key";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Enrollment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub enrollment_type: PackageType,
    pub start_date: DateTime<Utc>,
    pub expiration_date: DateTime<Utc>,
    pub price_paid: Decimal,
    pub discount_applied: Decimal,
    pub total_sessions: i32,
    pub sessions_used: i32,
    pub created_at: DateTime<Utc>,
}

impl Enrollment {
    pub fn sessions_remaining(&self) -> i32 {
        (self.total_sessions - self.sessions_used).max(0)
    }

    /// Whether `date` falls within the coverage period, compared by calendar day
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date.date_naive() <= date && date <= self.expiration_date.date_naive()
    }

    /// Enrolls a student in a course
    ///
    /// Steps, all inside one transaction:
    ///
    /// 1. lock the course row (`FOR UPDATE`), or fail with `CourseNotFound`
    /// 2. fail with `CourseFull` if enrollments already reach capacity
    /// 3. fail with `AlreadyEnrolled` if the student has an enrollment
    /// 4. price the package and compute its expiration
    /// 5. insert and commit
    ///
    /// A unique violation from a racing insert is reported as `AlreadyEnrolled`.
    pub async fn enroll(
        pool: &PgPool,
        user_id: Uuid,
        course_id: Uuid,
        package: PackageType,
        now: DateTime<Utc>,
    ) -> Result<Self, EnrollmentError> {
        let mut tx = pool.begin().await?;

        let (course_price, capacity): (Decimal, i32) =
            sqlx::query_as("SELECT price, capacity FROM courses WHERE id = $1 FOR UPDATE")
                .bind(course_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(EnrollmentError::CourseNotFound(course_id))?;

        let (enrolled,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM enrollments WHERE course_id = $1")
                .bind(course_id)
                .fetch_one(&mut *tx)
                .await?;

        if enrolled >= i64::from(capacity) {
            tracing::debug!(%course_id, enrolled, capacity, "Course is full");
            return Err(EnrollmentError::CourseFull);
        }

        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM enrollments WHERE user_id = $1 AND course_id = $2)",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(&mut *tx)
        .await?;

        if exists {
            return Err(EnrollmentError::AlreadyEnrolled);
        }

        let quote = price(course_price, package);
        let expiration_date = period(package, now)?;

        let enrollment = sqlx::query_as::<_, Enrollment>(
            r#"
            INSERT INTO enrollments (
                user_id, course_id, enrollment_type, start_date, expiration_date,
                price_paid, discount_applied, total_sessions
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, user_id, course_id, enrollment_type, start_date, expiration_date,
                      price_paid, discount_applied, total_sessions, sessions_used, created_at
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .bind(package)
        .bind(now)
        .bind(expiration_date)
        .bind(quote.total)
        .bind(quote.discount)
        .bind(quote.sessions)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, Some(USER_COURSE_CONSTRAINT)) {
                EnrollmentError::AlreadyEnrolled
            } else {
                EnrollmentError::Database(e)
            }
        })?;

        tx.commit().await?;

        tracing::info!(
            enrollment_id = %enrollment.id,
            %user_id,
            %course_id,
            package = %package,
            total = %quote.total,
            "Created enrollment"
        );

        Ok(enrollment)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let enrollment = sqlx::query_as::<_, Enrollment>(
            r#"
            SELECT id, user_id, course_id, enrollment_type, start_date, expiration_date,
                   price_paid, discount_applied, total_sessions, sessions_used, created_at
            FROM enrollments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(enrollment)
    }

    /// Lists a student's enrollments, newest first
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let enrollments = sqlx::query_as::<_, Enrollment>(
            r#"
            SELECT id, user_id, course_id, enrollment_type, start_date, expiration_date,
                   price_paid, discount_applied, total_sessions, sessions_used, created_at
            FROM enrollments
            WHERE user_id = $1
            ORDER BY created_at DESC, id
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(enrollments)
    }

    pub async fn count_for_course(pool: &PgPool, course_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM enrollments WHERE course_id = $1")
            .bind(course_id)
            .fetch_one(pool)
            .await?;

        Ok(count)
    }

    /// Cancels an enrollment, freeing its seat
    ///
    /// Returns false if the enrollment did not exist.
    pub async fn cancel(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM enrollments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() > 0 {
            tracing::info!(enrollment_id = %id, "Cancelled enrollment");
        }

        Ok(result.rows_affected() > 0)
    }
}
