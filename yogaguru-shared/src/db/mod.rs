/// Database layer
///
/// - `pool`: PostgreSQL connection pool with health checks
/// - `migrations`: embedded schema migrations from the workspace `migrations/` directory
///
/// Models and their queries live in [`crate::models`].

pub mod migrations;
pub mod pool;
