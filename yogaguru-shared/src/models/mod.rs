/// Database models for Yoga Guru
///
/// Each model carries its own SQL as static async functions taking a pool or,
/// for steps that must share a transaction, a `&mut PgConnection`.
///
/// # Models
///
/// - `user`: user accounts, roles and profiles
/// - `course`: the course catalog, owned by instructors
/// - `schedule`: weekly time slots attached to a course
/// - `enrollment`: a student's paid package on a course
/// - `attendance`: per-session attendance for an enrollment
/// - `payment`: payments recorded against an enrollment
///
/// # Example
///
/// ```no_run
/// use yogaguru_shared::models::course::Course;
/// use yogaguru_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// for details in Course::list_details(&pool).await? {
///     println!("{} ({} schedules)", details.course.title, details.schedules.len());
/// }
/// # Ok(())
/// # }
/// ```

pub mod attendance;
pub mod course;
pub mod enrollment;
pub mod payment;
pub mod schedule;
pub mod user;

/// Error returned when a string does not name a variant of a database enum
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// Returns true if `err` is a unique violation, optionally on a specific constraint
pub fn is_unique_violation(err: &sqlx::Error, constraint: Option<&str>) -> bool {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => match constraint {
            Some(name) => db.constraint() == Some(name),
            None => true,
        },
        _ => false,
    }
}
