/// Middleware for the API server
///
/// Authentication and role gating live in `yogaguru_shared::auth::middleware`.
/// This module holds the HTTP-level layers that apply to every response.

pub mod security;
