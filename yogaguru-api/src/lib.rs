//! # Yoga Guru API Server Library
//!
//! REST backend for a yoga studio: accounts, course catalog, enrollments with
//! capacity control, attendance and payments.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `bootstrap`: Startup tasks
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: HTTP middleware
//! - `routes`: API route handlers

pub mod app;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
