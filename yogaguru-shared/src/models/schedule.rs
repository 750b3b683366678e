/// Course schedules
///
/// A schedule is a recurring time slot: a set of weekdays, a start and end time
/// of day, and a recurrence. Schedules belong to exactly one course and are
/// always replaced as a whole list when a course is updated.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE schedule_recurrence AS ENUM ('weekly', 'biweekly', 'monthly');
///
/// CREATE TABLE schedules (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     course_id UUID NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
///     day_mask SMALLINT NOT NULL CHECK (day_mask BETWEEN 1 AND 127),
///     start_time TIME NOT NULL,
///     end_time TIME NOT NULL,
///     recurrence schedule_recurrence NOT NULL DEFAULT 'weekly',
///     CHECK (start_time < end_time)
/// );
/// ```

use std::str::FromStr;

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::ParseEnumError;

/// Error type for schedule validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("day mask must be between 1 and 127, got {0}")]
    InvalidDayMask(i32),

    #[error("start time {start} must be before end time {end}")]
    InvalidTimeRange { start: NaiveTime, end: NaiveTime },
}

/// Set of weekdays encoded as 7 bits, bit 0 = Sunday through bit 6 = Saturday
///
/// ```
/// use chrono::Weekday;
/// use yogaguru_shared::models::schedule::DayMask;
///
/// let mask = DayMask::new(0b0101010).unwrap();
/// assert_eq!(mask.days(), vec![Weekday::Mon, Weekday::Wed, Weekday::Fri]);
///
/// assert!(DayMask::new(0).is_err());
/// assert!(DayMask::new(128).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
#[serde(try_from = "i32", into = "i32")]
pub struct DayMask(i16);

impl DayMask {
    pub const MAX: i32 = 0b111_1111;

    pub fn new(bits: i32) -> Result<Self, ScheduleError> {
        if (1..=Self::MAX).contains(&bits) {
            Ok(Self(bits as i16))
        } else {
            Err(ScheduleError::InvalidDayMask(bits))
        }
    }

    /// Builds a mask from a non-empty list of weekdays
    pub fn from_days(days: &[Weekday]) -> Result<Self, ScheduleError> {
        let bits = days
            .iter()
            .fold(0, |acc, day| acc | (1 << day.num_days_from_sunday()));
        Self::new(bits)
    }

    pub fn bits(&self) -> i32 {
        i32::from(self.0)
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_sunday()) != 0
    }

    /// Weekdays in the mask, Sunday first
    pub fn days(&self) -> Vec<Weekday> {
        [
            Weekday::Sun,
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
        ]
        .into_iter()
        .filter(|day| self.contains(*day))
        .collect()
    }
}

impl TryFrom<i32> for DayMask {
    type Error = ScheduleError;

    fn try_from(bits: i32) -> Result<Self, Self::Error> {
        Self::new(bits)
    }
}

impl From<DayMask> for i32 {
    fn from(mask: DayMask) -> Self {
        mask.bits()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "schedule_recurrence", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    Weekly,
    Biweekly,
    Monthly,
}

impl FromStr for Recurrence {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekly" => Ok(Recurrence::Weekly),
            "biweekly" => Ok(Recurrence::Biweekly),
            "monthly" => Ok(Recurrence::Monthly),
            other => Err(ParseEnumError::new("recurrence", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Schedule {
    pub id: Uuid,
    pub course_id: Uuid,
    pub day_mask: DayMask,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub recurrence: Recurrence,
}

/// A validated schedule ready to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSchedule {
    pub day_mask: DayMask,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub recurrence: Recurrence,
}

impl NewSchedule {
    pub fn new(
        day_mask: DayMask,
        start_time: NaiveTime,
        end_time: NaiveTime,
        recurrence: Recurrence,
    ) -> Result<Self, ScheduleError> {
        if start_time >= end_time {
            return Err(ScheduleError::InvalidTimeRange {
                start: start_time,
                end: end_time,
            });
        }

        Ok(Self {
            day_mask,
            start_time,
            end_time,
            recurrence,
        })
    }
}

impl Schedule {
    /// Inserts schedules for a course on an open connection or transaction
    pub async fn insert_all(
        conn: &mut PgConnection,
        course_id: Uuid,
        schedules: &[NewSchedule],
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut inserted = Vec::with_capacity(schedules.len());

        for schedule in schedules {
            let row = sqlx::query_as::<_, Schedule>(
                r#"
                INSERT INTO schedules (course_id, day_mask, start_time, end_time, recurrence)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, course_id, day_mask, start_time, end_time, recurrence
                "#,
            )
            .bind(course_id)
            .bind(schedule.day_mask)
            .bind(schedule.start_time)
            .bind(schedule.end_time)
            .bind(schedule.recurrence)
            .fetch_one(&mut *conn)
            .await?;

            inserted.push(row);
        }

        Ok(inserted)
    }

    /// Deletes every schedule of a course and inserts the given list
    ///
    /// Must run inside the caller's transaction so the swap is atomic.
    pub async fn replace_all(
        conn: &mut PgConnection,
        course_id: Uuid,
        schedules: &[NewSchedule],
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query("DELETE FROM schedules WHERE course_id = $1")
            .bind(course_id)
            .execute(&mut *conn)
            .await?;

        Self::insert_all(conn, course_id, schedules).await
    }

    pub async fn list_for_course(pool: &PgPool, course_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let schedules = sqlx::query_as::<_, Schedule>(
            r#"
            SELECT id, course_id, day_mask, start_time, end_time, recurrence
            FROM schedules
            WHERE course_id = $1
            ORDER BY start_time, id
            "#,
        )
        .bind(course_id)
        .fetch_all(pool)
        .await?;

        Ok(schedules)
    }

    /// Loads schedules for many courses in one query
    pub async fn list_for_courses(
        pool: &PgPool,
        course_ids: &[Uuid],
    ) -> Result<Vec<Self>, sqlx::Error> {
        let schedules = sqlx::query_as::<_, Schedule>(
            r#"
            SELECT id, course_id, day_mask, start_time, end_time, recurrence
            FROM schedules
            WHERE course_id = ANY($1)
            ORDER BY start_time, id
            "#,
        )
        .bind(course_ids)
        .fetch_all(pool)
        .await?;

        Ok(schedules)
    }
}
