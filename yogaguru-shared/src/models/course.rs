/// Course catalog model and database operations
///
/// A course is owned by the instructor who created it. Its schedules live in
/// their own table and are written in the same transaction as the course.
/// Deleting a course removes its enrollments first, then the course row (the
/// schedules go with it through `ON DELETE CASCADE`).
///
/// # Schema
///
/// ```sql
/// CREATE TYPE course_level AS ENUM ('beginner', 'intermediate', 'advanced');
///
/// CREATE TABLE courses (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(200) NOT NULL,
///     course_type VARCHAR(100) NOT NULL,
///     level course_level NOT NULL,
///     price NUMERIC(10, 2) NOT NULL CHECK (price > 0),
///     capacity INTEGER NOT NULL CHECK (capacity > 0),
///     instructor_id UUID NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use rust_decimal::Decimal;
/// use yogaguru_shared::models::course::{Course, CourseLevel, NewCourse};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, instructor_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let course = NewCourse {
///     title: "Morning Hatha".to_string(),
///     course_type: "hatha".to_string(),
///     level: CourseLevel::Beginner,
///     price: Decimal::new(2000, 2),
///     capacity: 12,
///     schedules: vec![],
/// };
/// course.validate()?;
///
/// let created = Course::create(&pool, instructor_id, course).await?;
/// println!("Created course {}", created.course.id);
/// # Ok(())
/// # }
/// ```

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::schedule::{NewSchedule, Schedule, ScheduleError};
use super::ParseEnumError;

/// Maximum title length in characters
pub const MAX_TITLE_LENGTH: usize = 200;

/// Largest per-session price that fits `NUMERIC(10, 2)`
// 9_999_999_999 scale 2 (= 99_999_999.99); `Decimal::new` is not const.
pub const MAX_PRICE: Decimal = Decimal::from_parts(0x540B_E3FF, 0x2, 0, false, 2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "course_level", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CourseLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl FromStr for CourseLevel {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beginner" => Ok(CourseLevel::Beginner),
            "intermediate" => Ok(CourseLevel::Intermediate),
            "advanced" => Ok(CourseLevel::Advanced),
            other => Err(ParseEnumError::new("level", other)),
        }
    }
}

/// Error type for course validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CourseValidationError {
    #[error("title must be between 1 and 200 characters")]
    InvalidTitle,

    #[error("price must be greater than zero")]
    NonPositivePrice,

    #[error("price must not exceed 99999999.99")]
    PriceTooLarge,

    #[error("price must have at most 2 decimal places")]
    PriceScale,

    #[error("capacity must be greater than zero")]
    NonPositiveCapacity,

    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

/// Error type for course updates
#[derive(Debug, thiserror::Error)]
pub enum CourseError {
    #[error("capacity {capacity} is below the {enrolled} current enrollments")]
    CapacityBelowEnrollment { capacity: i32, enrolled: i64 },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub course_type: String,
    pub level: CourseLevel,

    /// Price of a single session
    pub price: Decimal,

    /// Maximum number of concurrent enrollments
    pub capacity: i32,

    pub instructor_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Course together with its schedules and instructor display name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseDetails {
    #[serde(flatten)]
    pub course: Course,

    pub instructor_name: Option<String>,

    pub schedules: Vec<Schedule>,
}

#[derive(Debug, sqlx::FromRow)]
struct CourseRow {
    #[sqlx(flatten)]
    course: Course,
    instructor_name: Option<String>,
}

/// Input for creating a course
#[derive(Debug, Clone)]
pub struct NewCourse {
    pub title: String,
    pub course_type: String,
    pub level: CourseLevel,
    pub price: Decimal,
    pub capacity: i32,
    pub schedules: Vec<NewSchedule>,
}

/// Partial update of a course
///
/// `schedules: Some(list)` replaces every existing schedule with `list`.
#[derive(Debug, Clone, Default)]
pub struct UpdateCourse {
    pub title: Option<String>,
    pub course_type: Option<String>,
    pub level: Option<CourseLevel>,
    pub price: Option<Decimal>,
    pub capacity: Option<i32>,
    pub schedules: Option<Vec<NewSchedule>>,
}

fn validate_title(title: &str) -> Result<(), CourseValidationError> {
    let len = title.trim().chars().count();
    if len == 0 || len > MAX_TITLE_LENGTH {
        return Err(CourseValidationError::InvalidTitle);
    }
    Ok(())
}

fn validate_price(price: Decimal) -> Result<(), CourseValidationError> {
    if price <= Decimal::ZERO {
        return Err(CourseValidationError::NonPositivePrice);
    }
    if price > MAX_PRICE {
        return Err(CourseValidationError::PriceTooLarge);
    }
    if price.normalize().scale() > 2 {
        return Err(CourseValidationError::PriceScale);
    }
    Ok(())
}

fn validate_capacity(capacity: i32) -> Result<(), CourseValidationError> {
    if capacity <= 0 {
        return Err(CourseValidationError::NonPositiveCapacity);
    }
    Ok(())
}

impl NewCourse {
    pub fn validate(&self) -> Result<(), CourseValidationError> {
        validate_title(&self.title)?;
        validate_price(self.price)?;
        validate_capacity(self.capacity)
    }
}

impl UpdateCourse {
    /// Validates only the fields that are present
    pub fn validate(&self) -> Result<(), CourseValidationError> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        if let Some(capacity) = self.capacity {
            validate_capacity(capacity)?;
        }
        Ok(())
    }
}

impl Course {
    /// Creates a course and its schedules in one transaction
    pub async fn create(
        pool: &PgPool,
        instructor_id: Uuid,
        data: NewCourse,
    ) -> Result<CourseDetails, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let course = sqlx::query_as::<_, Course>(
            r#"
            INSERT INTO courses (title, course_type, level, price, capacity, instructor_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, title, course_type, level, price, capacity, instructor_id,
                      created_at, updated_at
            "#,
        )
        .bind(data.title.trim())
        .bind(&data.course_type)
        .bind(data.level)
        .bind(data.price)
        .bind(data.capacity)
        .bind(instructor_id)
        .fetch_one(&mut *tx)
        .await?;

        let schedules = Schedule::insert_all(&mut *tx, course.id, &data.schedules).await?;

        let (instructor_name,): (Option<String>,) =
            sqlx::query_as("SELECT name FROM profiles WHERE user_id = $1")
                .bind(instructor_id)
                .fetch_optional(&mut *tx)
                .await?
                .unwrap_or((None,));

        tx.commit().await?;

        tracing::info!(course_id = %course.id, %instructor_id, "Created course");

        Ok(CourseDetails {
            course,
            instructor_name,
            schedules,
        })
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let course = sqlx::query_as::<_, Course>(
            r#"
            SELECT id, title, course_type, level, price, capacity, instructor_id,
                   created_at, updated_at
            FROM courses
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(course)
    }

    /// Loads a course with schedules and instructor name
    pub async fn find_details(pool: &PgPool, id: Uuid) -> Result<Option<CourseDetails>, sqlx::Error> {
        let row = sqlx::query_as::<_, CourseRow>(
            r#"
            SELECT c.id, c.title, c.course_type, c.level, c.price, c.capacity,
                   c.instructor_id, c.created_at, c.updated_at,
                   p.name AS instructor_name
            FROM courses c
            LEFT JOIN profiles p ON p.user_id = c.instructor_id
            WHERE c.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let schedules = Schedule::list_for_course(pool, id).await?;

        Ok(Some(CourseDetails {
            course: row.course,
            instructor_name: row.instructor_name,
            schedules,
        }))
    }

    /// Lists every course with schedules and instructor names, newest first
    pub async fn list_details(pool: &PgPool) -> Result<Vec<CourseDetails>, sqlx::Error> {
        let rows = sqlx::query_as::<_, CourseRow>(
            r#"
            SELECT c.id, c.title, c.course_type, c.level, c.price, c.capacity,
                   c.instructor_id, c.created_at, c.updated_at,
                   p.name AS instructor_name
            FROM courses c
            LEFT JOIN profiles p ON p.user_id = c.instructor_id
            ORDER BY c.created_at DESC, c.id
            "#,
        )
        .fetch_all(pool)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.course.id).collect();
        let mut by_course: HashMap<Uuid, Vec<Schedule>> = HashMap::new();
        for schedule in Schedule::list_for_courses(pool, &ids).await? {
            by_course.entry(schedule.course_id).or_default().push(schedule);
        }

        Ok(rows
            .into_iter()
            .map(|row| CourseDetails {
                schedules: by_course.remove(&row.course.id).unwrap_or_default(),
                instructor_name: row.instructor_name,
                course: row.course,
            })
            .collect())
    }

    /// Applies a partial update, replacing schedules if given, in one transaction
    ///
    /// The course row is locked first so a capacity change cannot race an
    /// enrollment. Lowering capacity below the current enrollment count fails
    /// with `CapacityBelowEnrollment`.
    ///
    /// Returns `None` if the course does not exist.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateCourse,
    ) -> Result<Option<CourseDetails>, CourseError> {
        let mut tx = pool.begin().await?;

        let locked: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM courses WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        if locked.is_none() {
            return Ok(None);
        }

        if let Some(capacity) = data.capacity {
            let (enrolled,): (i64,) =
                sqlx::query_as("SELECT COUNT(*) FROM enrollments WHERE course_id = $1")
                    .bind(id)
                    .fetch_one(&mut *tx)
                    .await?;

            if enrolled > i64::from(capacity) {
                return Err(CourseError::CapacityBelowEnrollment { capacity, enrolled });
            }
        }

        let course = sqlx::query_as::<_, Course>(
            r#"
            UPDATE courses
            SET title = COALESCE($2, title),
                course_type = COALESCE($3, course_type),
                level = COALESCE($4, level),
                price = COALESCE($5, price),
                capacity = COALESCE($6, capacity),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, title, course_type, level, price, capacity, instructor_id,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(data.title.as_deref().map(str::trim))
        .bind(data.course_type)
        .bind(data.level)
        .bind(data.price)
        .bind(data.capacity)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(course) = course else {
            return Ok(None);
        };

        if let Some(schedules) = &data.schedules {
            Schedule::replace_all(&mut *tx, id, schedules).await?;
        }

        tx.commit().await?;

        tracing::info!(course_id = %id, "Updated course");

        Ok(Self::find_details(pool, course.id).await?)
    }

    /// Deletes a course and all of its enrollments in one transaction
    ///
    /// Returns false if the course did not exist.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        // blocks concurrent enrollments until the course is gone
        let locked: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM courses WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        if locked.is_none() {
            return Ok(false);
        }

        let enrollments = sqlx::query("DELETE FROM enrollments WHERE course_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        tx.commit().await?;

        tracing::info!(
            course_id = %id,
            enrollments_removed = enrollments.rows_affected(),
            "Deleted course"
        );

        Ok(true)
    }
}
