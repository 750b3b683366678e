/// Attendance records for enrollment sessions
///
/// One record per enrollment and class date. Marking a session as attended
/// consumes one of the enrollment's sessions; the enrollment row is locked while
/// that happens so the counter cannot overshoot.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE attendance (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     enrollment_id UUID NOT NULL REFERENCES enrollments(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id),
///     course_id UUID NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
///     session_date DATE NOT NULL,
///     attended BOOLEAN NOT NULL DEFAULT TRUE,
///     recorded_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT attendance_enrollment_session_key UNIQUE (enrollment_id, session_date)
/// );
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::enrollment::Enrollment;
use super::is_unique_violation;

pub const ENROLLMENT_SESSION_CONSTRAINT: &str = "attendance_enrollment_session_key";

#[derive(Debug, thiserror::Error)]
pub enum AttendanceError {
    #[error("Enrollment {0} not found")]
    EnrollmentNotFound(Uuid),

    #[error("Session date {0} is outside the enrollment period")]
    OutsidePeriod(NaiveDate),

    #[error("All sessions of this enrollment have been used")]
    SessionsExhausted,

    #[error("Attendance for {0} is already recorded")]
    AlreadyRecorded(NaiveDate),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Attendance {
    pub id: Uuid,
    pub enrollment_id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub session_date: NaiveDate,
    pub attended: bool,
    pub recorded_at: DateTime<Utc>,
}

impl Attendance {
    /// Records attendance for one session of an enrollment
    pub async fn record(
        pool: &PgPool,
        enrollment_id: Uuid,
        session_date: NaiveDate,
        attended: bool,
    ) -> Result<Self, AttendanceError> {
        let mut tx = pool.begin().await?;

        let enrollment = sqlx::query_as::<_, Enrollment>(
            r#"
            SELECT id, user_id, course_id, enrollment_type, start_date, expiration_date,
                   price_paid, discount_applied, total_sessions, sessions_used, created_at
            FROM enrollments
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(enrollment_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AttendanceError::EnrollmentNotFound(enrollment_id))?;

        if !enrollment.covers(session_date) {
            return Err(AttendanceError::OutsidePeriod(session_date));
        }

        if attended && enrollment.sessions_remaining() == 0 {
            return Err(AttendanceError::SessionsExhausted);
        }

        let record = sqlx::query_as::<_, Attendance>(
            r#"
            INSERT INTO attendance (enrollment_id, user_id, course_id, session_date, attended)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, enrollment_id, user_id, course_id, session_date, attended, recorded_at
            "#,
        )
        .bind(enrollment.id)
        .bind(enrollment.user_id)
        .bind(enrollment.course_id)
        .bind(session_date)
        .bind(attended)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, Some(ENROLLMENT_SESSION_CONSTRAINT)) {
                AttendanceError::AlreadyRecorded(session_date)
            } else {
                AttendanceError::Database(e)
            }
        })?;

        if attended {
            sqlx::query("UPDATE enrollments SET sessions_used = sessions_used + 1 WHERE id = $1")
                .bind(enrollment.id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::debug!(%enrollment_id, %session_date, attended, "Recorded attendance");

        Ok(record)
    }

    /// Lists attendance of an enrollment, newest session first
    pub async fn list_for_enrollment(
        pool: &PgPool,
        enrollment_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let records = sqlx::query_as::<_, Attendance>(
            r#"
            SELECT id, enrollment_id, user_id, course_id, session_date, attended, recorded_at
            FROM attendance
            WHERE enrollment_id = $1
            ORDER BY session_date DESC
            "#,
        )
        .bind(enrollment_id)
        .fetch_all(pool)
        .await?;

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attendance_error_messages() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        assert_eq!(
            AttendanceError::OutsidePeriod(date).to_string(),
            "Session date 2024-06-01 is outside the enrollment period"
        );
        assert_eq!(
            AttendanceError::AlreadyRecorded(date).to_string(),
            "Attendance for 2024-06-01 is already recorded"
        );
    }

    #[test]
    fn test_attendance_serialization() {
        let record = Attendance {
            id: Uuid::new_v4(),
            enrollment_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            session_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            attended: true,
            recorded_at: Utc::now(),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["session_date"], "2024-06-01");
        assert_eq!(json["attended"], true);
    }
}
