//! Enrollment pricing and coverage periods
//!
//! A student buys a package on a course. The package decides how many sessions
//! are covered, what discount applies to the per-session price, and how long the
//! enrollment stays valid.
//!
//! | package     | sessions | discount | period    |
//! |-------------|----------|----------|-----------|
//! | pre_session | 1        | 0%       | same day  |
//! | monthly     | 4        | 10%      | 1 month   |
//! | six_month   | 24       | 20%      | 6 months  |
//! | yearly      | 48       | 30%      | 12 months |
//!
//! All money is [`Decimal`] and totals are never rounded: `15 × 48 × 0.70` is
//! exactly `504` and `20.01 × 4 × 0.90` is exactly `72.036`.
//!
//! ```
//! use rust_decimal::Decimal;
//! use yogaguru_shared::enrollment::{price, PackageType};
//!
//! let quote = price(Decimal::new(20, 0), PackageType::Monthly);
//! assert_eq!(quote.total, Decimal::new(72, 0));
//! assert_eq!(quote.discount, Decimal::new(10, 2));
//! assert_eq!(quote.sessions, 4);
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Months, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error type for enrollment creation
#[derive(Debug, thiserror::Error)]
pub enum EnrollmentError {
    #[error("Invalid enrollment type: {0}")]
    InvalidEnrollmentType(String),

    #[error("Course {0} not found")]
    CourseNotFound(Uuid),

    #[error("Course is full")]
    CourseFull,

    #[error("You are already enrolled in this course")]
    AlreadyEnrolled,

    #[error("Enrollment period is out of range")]
    PeriodOutOfRange,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Session package a student buys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "enrollment_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PackageType {
    PreSession,
    Monthly,
    SixMonth,
    Yearly,
}

impl PackageType {
    pub const ALL: [PackageType; 4] = [
        PackageType::PreSession,
        PackageType::Monthly,
        PackageType::SixMonth,
        PackageType::Yearly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PackageType::PreSession => "pre_session",
            PackageType::Monthly => "monthly",
            PackageType::SixMonth => "six_month",
            PackageType::Yearly => "yearly",
        }
    }

    /// Number of sessions the package covers
    pub fn sessions(&self) -> i32 {
        match self {
            PackageType::PreSession => 1,
            PackageType::Monthly => 4,
            PackageType::SixMonth => 24,
            PackageType::Yearly => 48,
        }
    }

    /// Discount as a fraction of the undiscounted total
    pub fn discount(&self) -> Decimal {
        match self {
            PackageType::PreSession => Decimal::ZERO,
            PackageType::Monthly => Decimal::new(10, 2),
            PackageType::SixMonth => Decimal::new(20, 2),
            PackageType::Yearly => Decimal::new(30, 2),
        }
    }

    /// Length of the coverage period in calendar months
    pub fn months(&self) -> u32 {
        match self {
            PackageType::PreSession => 0,
            PackageType::Monthly => 1,
            PackageType::SixMonth => 6,
            PackageType::Yearly => 12,
        }
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageType {
    type Err = EnrollmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PackageType::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| EnrollmentError::InvalidEnrollmentType(s.to_string()))
    }
}

/// Result of pricing a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Quote {
    /// Amount due, exact to four decimal places for a two-place price
    pub total: Decimal,

    /// Discount fraction that was applied
    pub discount: Decimal,

    /// Sessions covered
    pub sessions: i32,
}

/// Prices a package for a course with the given per-session price
pub fn price(course_price: Decimal, package: PackageType) -> Quote {
    let sessions = package.sessions();
    let discount = package.discount();
    let total = course_price * Decimal::from(sessions) * (Decimal::ONE - discount);

    Quote {
        total,
        discount,
        sessions,
    }
}

/// Computes when an enrollment bought at `now` expires
///
/// Month arithmetic clamps to the end of the target month, so a monthly package
/// bought on January 31st expires on the last day of February.
pub fn period(package: PackageType, now: DateTime<Utc>) -> Result<DateTime<Utc>, EnrollmentError> {
    now.checked_add_months(Months::new(package.months()))
        .ok_or(EnrollmentError::PeriodOutOfRange)
}
