/// Configuration for the API server
///
/// Loaded from environment variables, with a `.env` file read first if present.
///
/// # Environment Variables
///
/// - `API_HOST`: host to bind to (default: 0.0.0.0)
/// - `API_PORT`: port to bind to (default: 8080)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `JWT_SECRET`: HS256 signing secret, at least 32 characters (required)
/// - `CORS_ORIGINS`: comma-separated allowed origins (default: `*`)
/// - `PRODUCTION`: `true` enables HSTS (default: false)
/// - `ADMIN_PHONE` / `ADMIN_PASSWORD`: admin account created at startup if missing
/// - `RUST_LOG`: log filter
/// - `LOG_FORMAT`: `json` for structured logs (read before `.env` is loaded)
///
/// # Example
///
/// ```no_run
/// use yogaguru_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::env;

use yogaguru_shared::auth::password::validate_password_strength;

/// Minimum length of `JWT_SECRET`
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,

    /// Admin account ensured at startup
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Enables production-only security headers
    pub production: bool,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,
}

#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub phone: String,
    pub password: String,
}

impl Config {
    /// Loads configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value is invalid.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_host = lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let api_port = lookup("API_PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse::<u16>()
            .map_err(|e| anyhow::anyhow!("API_PORT is invalid: {}", e))?;

        let cors_origins: Vec<String> = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let production = match lookup("PRODUCTION") {
            Some(value) => parse_bool(&value)
                .ok_or_else(|| anyhow::anyhow!("PRODUCTION must be true or false, got {}", value))?,
            None => false,
        };

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = lookup("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse::<u32>()
            .map_err(|e| anyhow::anyhow!("DATABASE_MAX_CONNECTIONS is invalid: {}", e))?;

        let jwt_secret = lookup("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            anyhow::bail!(
                "JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LENGTH
            );
        }

        let bootstrap_admin = match (lookup("ADMIN_PHONE"), lookup("ADMIN_PASSWORD")) {
            (Some(phone), Some(password)) => {
                validate_password_strength(&password)
                    .map_err(|e| anyhow::anyhow!("ADMIN_PASSWORD is invalid: {}", e))?;
                Some(BootstrapAdmin { phone, password })
            }
            (None, None) => None,
            _ => anyhow::bail!("ADMIN_PHONE and ADMIN_PASSWORD must be set together"),
        };

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                cors_origins,
                production,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig { secret: jwt_secret },
            bootstrap_admin,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    pub fn allows_any_origin(&self) -> bool {
        self.api.cors_origins.iter().any(|origin| origin == "*")
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" | "" => Some(false),
        _ => None,
    }
}
