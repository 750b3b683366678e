/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use yogaguru_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = yogaguru_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer, routes};
use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn,
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use yogaguru_shared::{
    auth::middleware::{create_jwt_middleware, create_role_middleware},
    models::user::Role,
};

/// Shared application state
///
/// Cloned into every handler through the `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

const ADMIN: &[Role] = &[Role::Admin];
const TEACHING: &[Role] = &[Role::Instructor, Role::Admin];
const LEARNING: &[Role] = &[Role::Student, Role::Admin];

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET    /health                       public
/// ├── POST   /register | /login | /refresh public
/// ├── GET    /courses, /courses/:id        public
/// ├── POST   /courses                      instructor, admin
/// ├── PUT    /courses/:id                  owning instructor, admin
/// ├── DELETE /courses/:id                  owning instructor, admin
/// ├── GET    /users/me                     authenticated
/// ├── PUT    /users/:id/role               admin
/// ├── DELETE /users/:id                    admin
/// ├── POST   /enrollments                  student, admin
/// ├── GET    /enrollments/me               student, admin
/// ├── GET    /enrollments/:id              owning student, admin
/// ├── DELETE /enrollments/:id              owning student, admin
/// ├── POST   /enrollments/:id/attendance   course instructor, admin
/// ├── GET    /enrollments/:id/attendance   owner, course instructor, admin
/// ├── POST   /enrollments/:id/payments     owning student, admin
/// ├── GET    /enrollments/:id/payments     owning student, admin
/// └── PUT    /payments/:id/status          admin
/// ```
///
/// # Middleware Stack
///
/// Route groups are gated by the JWT layer (outer) and a role layer (inner).
/// Ownership is checked inside handlers. Around everything:
/// 1. Logging (tower-http TraceLayer)
/// 2. Response compression (gzip, brotli)
/// 3. CORS (tower-http CorsLayer)
/// 4. Security headers
pub fn build_router(state: AppState) -> Router {
    let secret = state.jwt_secret().to_string();
    let jwt = || from_fn(create_jwt_middleware(secret.clone()));

    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh))
        .route("/courses", get(routes::courses::list_courses))
        .route("/courses/:id", get(routes::courses::get_course));

    // Any valid access token; finer checks happen in the handlers
    let authenticated_routes = Router::new()
        .route("/users/me", get(routes::users::me))
        .route(
            "/enrollments/:id/attendance",
            post(routes::attendance::record_attendance).get(routes::attendance::list_attendance),
        )
        .route(
            "/enrollments/:id/payments",
            post(routes::payments::create_payment).get(routes::payments::list_payments),
        )
        .route_layer(jwt());

    let admin_routes = Router::new()
        .route("/users/:id/role", put(routes::users::update_role))
        .route("/users/:id", axum::routing::delete(routes::users::delete_user))
        .route("/payments/:id/status", put(routes::payments::update_payment_status))
        .route_layer(from_fn(create_role_middleware(ADMIN)))
        .route_layer(jwt());

    let instructor_routes = Router::new()
        .route("/courses", post(routes::courses::create_course))
        .route(
            "/courses/:id",
            put(routes::courses::update_course).delete(routes::courses::delete_course),
        )
        .route_layer(from_fn(create_role_middleware(TEACHING)))
        .route_layer(jwt());

    let student_routes = Router::new()
        .route("/enrollments", post(routes::enrollments::create_enrollment))
        .route("/enrollments/me", get(routes::enrollments::my_enrollments))
        .route(
            "/enrollments/:id",
            get(routes::enrollments::get_enrollment).delete(routes::enrollments::cancel_enrollment),
        )
        .route_layer(from_fn(create_role_middleware(LEARNING)))
        .route_layer(jwt());

    let cors = cors_layer(&state.config);

    Router::new()
        .merge(public_routes)
        .merge(authenticated_routes)
        .merge(admin_routes)
        .merge(instructor_routes)
        .merge(student_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.allows_any_origin() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
