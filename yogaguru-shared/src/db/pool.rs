/// PostgreSQL connection pool
///
/// The pool is created once at startup, checked with `SELECT 1`, and handed to
/// the router state. Handlers never open their own connections.
///
/// # Example
///
/// ```no_run
/// use yogaguru_shared::db::pool::{close_pool, create_pool, DatabaseConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig::new(std::env::var("DATABASE_URL")?);
///     let pool = create_pool(config).await?;
///
///     close_pool(pool).await;
///     Ok(())
/// }
/// ```

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, info};

/// Connection pool settings, timeouts in seconds
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    pub max_connections: u32,

    /// Idle connections kept warm
    pub min_connections: u32,

    /// How long to wait for a free connection before failing the request
    pub acquire_timeout_seconds: u64,

    /// Close connections idle for longer than this (None = never)
    pub idle_timeout_seconds: Option<u64>,

    /// Recycle connections older than this (None = never)
    pub max_lifetime_seconds: Option<u64>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_seconds: 30,
            idle_timeout_seconds: Some(600),
            max_lifetime_seconds: Some(1800),
        }
    }
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self.min_connections = self.min_connections.min(max_connections);
        self
    }

    fn pool_options(&self) -> PgPoolOptions {
        let mut options = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(Duration::from_secs(self.acquire_timeout_seconds));

        if let Some(idle_timeout) = self.idle_timeout_seconds {
            options = options.idle_timeout(Duration::from_secs(idle_timeout));
        }
        if let Some(max_lifetime) = self.max_lifetime_seconds {
            options = options.max_lifetime(Duration::from_secs(max_lifetime));
        }

        options
    }
}

/// Creates the pool and verifies the database answers
///
/// # Errors
///
/// Returns an error if the URL is invalid, the database is unreachable, or the
/// health check fails.
pub async fn create_pool(config: DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Creating database connection pool"
    );

    let pool = config.pool_options().connect(&config.url).await?;

    health_check(&pool).await?;

    info!("Database connection pool created");
    Ok(pool)
}

/// Creates a pool that connects on first use
///
/// Used by router tests that never reach the database.
pub fn create_lazy_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    config.pool_options().connect_lazy(&config.url)
}

/// Runs `SELECT 1` against the pool
pub async fn health_check(pool: &PgPool) -> Result<(), sqlx::Error> {
    let (one,): (i32,) = sqlx::query_as("SELECT 1").fetch_one(pool).await?;

    if one != 1 {
        return Err(sqlx::Error::Protocol(format!(
            "Health check returned unexpected value: {}",
            one
        )));
    }

    debug!("Database health check passed");
    Ok(())
}

/// Snapshot of pool usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PoolStats {
    pub active_connections: u32,
    pub idle_connections: u32,
    pub total_connections: u32,
}

pub fn get_pool_stats(pool: &PgPool) -> PoolStats {
    let size = pool.size();
    let idle = pool.num_idle() as u32;

    PoolStats {
        active_connections: size.saturating_sub(idle),
        idle_connections: idle,
        total_connections: size,
    }
}

/// Closes the pool, waiting for checked-out connections to be returned
pub async fn close_pool(pool: PgPool) {
    info!("Closing database connection pool");
    pool.close().await;
    info!("Database connection pool closed");
}
