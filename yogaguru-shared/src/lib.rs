//! # Yoga Guru Shared Library
//!
//! Domain types and business logic used by the Yoga Guru API server.
//!
//! ## Module Organization
//!
//! - `auth`: password hashing, JWT tokens, authentication middleware, role and ownership checks
//! - `db`: connection pool and migrations
//! - `enrollment`: package pricing and coverage periods
//! - `models`: database models for users, courses, schedules, enrollments, attendance and payments

pub mod auth;
pub mod db;
pub mod enrollment;
pub mod models;

/// Current version of the shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
