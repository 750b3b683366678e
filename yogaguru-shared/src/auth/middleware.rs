/// Authentication middleware for Axum
///
/// Two layers are provided:
///
/// - **JWT Middleware**: validates the `Authorization: Bearer <token>` header and
///   inserts an [`AuthContext`] into the request extensions
/// - **Role Middleware**: rejects requests whose `AuthContext` role is not in an
///   allowed list; must run after the JWT middleware
///
/// # Example
///
/// ```no_run
/// use axum::{Extension, Router, routing::post, middleware};
/// use yogaguru_shared::auth::middleware::{create_jwt_middleware, create_role_middleware, AuthContext};
/// use yogaguru_shared::models::user::Role;
///
/// async fn create_course(Extension(auth): Extension<AuthContext>) -> String {
///     format!("Hello, {} {}!", auth.role, auth.user_id)
/// }
///
/// // layers run bottom-up: jwt first, then the role check
/// let app: Router = Router::new()
///     .route("/courses", post(create_course))
///     .layer(middleware::from_fn(create_role_middleware(&[Role::Instructor, Role::Admin])))
///     .layer(middleware::from_fn(create_jwt_middleware("your-jwt-secret".to_string())));
/// ```

use std::{future::Future, pin::Pin};

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::authorization::require_any_role;
use super::jwt::{validate_access_token, AccessClaims, JwtError};
use crate::models::user::Role;

/// Authenticated caller, added to request extensions by the JWT middleware
///
/// ```
/// use axum::Extension;
/// use yogaguru_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("User: {}, Role: {}", auth.user_id, auth.role)
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthContext {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<AccessClaims> for AuthContext {
    fn from(claims: AccessClaims) -> Self {
        Self::new(claims.user_id, claims.role)
    }
}

/// Error type for authentication middleware
#[derive(Debug)]
pub enum AuthError {
    /// Missing authorization header
    MissingCredentials,

    /// Authorization header is not `Bearer <token>`
    InvalidFormat(String),

    /// Token validation failed
    InvalidToken(String),

    /// Authenticated, but the role is not allowed on this route
    Forbidden(String),
}

impl AuthError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AuthError::MissingCredentials
            | AuthError::InvalidFormat(_)
            | AuthError::InvalidToken(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AuthError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = match self {
            AuthError::MissingCredentials => "Missing credentials".to_string(),
            AuthError::InvalidFormat(msg)
            | AuthError::InvalidToken(msg)
            | AuthError::Forbidden(msg) => msg,
        };

        (status, Json(json!({ "error": code, "message": message }))).into_response()
    }
}

/// JWT authentication middleware
///
/// # Errors
///
/// Returns 401 Unauthorized if:
/// - Authorization header is missing
/// - Header is not a Bearer token
/// - Token is invalid, expired, or a refresh token
pub async fn jwt_auth_middleware(
    secret: String,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    let claims = validate_access_token(token, &secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        JwtError::WrongTokenType { .. } => {
            AuthError::InvalidToken("Access token required".to_string())
        }
        _ => AuthError::InvalidToken(format!("Invalid token: {}", e)),
    })?;

    req.extensions_mut().insert(AuthContext::from(claims));

    Ok(next.run(req).await)
}

/// Role gate middleware
///
/// Reads the [`AuthContext`] inserted by [`jwt_auth_middleware`] and returns
/// 403 unless its role is in `allowed`. A request without a context is treated
/// as unauthenticated.
pub async fn role_middleware(
    allowed: &'static [Role],
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth = req
        .extensions()
        .get::<AuthContext>()
        .copied()
        .ok_or(AuthError::MissingCredentials)?;

    require_any_role(&auth, allowed).map_err(|e| {
        tracing::debug!(user_id = %auth.user_id, role = %auth.role, "Role check failed");
        AuthError::Forbidden(e.to_string())
    })?;

    Ok(next.run(req).await)
}

type MiddlewareFuture = Pin<Box<dyn Future<Output = Result<Response, AuthError>> + Send>>;

/// Creates a JWT authentication middleware closure
///
/// Captures the secret and returns a function usable with `axum::middleware::from_fn`.
pub fn create_jwt_middleware(
    secret: String,
) -> impl Fn(Request, Next) -> MiddlewareFuture + Clone {
    move |req, next| {
        let secret = secret.clone();
        Box::pin(jwt_auth_middleware(secret, req, next))
    }
}

/// Creates a role gate middleware closure for the given roles
pub fn create_role_middleware(
    allowed: &'static [Role],
) -> impl Fn(Request, Next) -> MiddlewareFuture + Clone {
    move |req, next| Box::pin(role_middleware(allowed, req, next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::issue_token_pair;
    use axum::{body::Body, middleware, routing::get, Extension, Router};
    use tower::ServiceExt;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    async fn whoami(Extension(auth): Extension<AuthContext>) -> String {
        auth.role.to_string()
    }

    fn app(allowed: &'static [Role]) -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .layer(middleware::from_fn(create_role_middleware(allowed)))
            .layer(middleware::from_fn(create_jwt_middleware(SECRET.to_string())))
    }

    fn request(auth: Option<String>) -> Request {
        let mut builder = Request::builder().uri("/whoami");
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_auth_context_from_claims() {
        let user_id = Uuid::new_v4();
        let context = AuthContext::from(AccessClaims {
            user_id,
            role: Role::Admin,
            expires_at: 0,
        });

        assert_eq!(context.user_id, user_id);
        assert!(context.is_admin());
        assert!(!AuthContext::new(user_id, Role::Student).is_admin());
    }

    #[test]
    fn test_auth_error_into_response() {
        let response = AuthError::MissingCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = AuthError::InvalidFormat("test".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = AuthError::Forbidden("test".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthorized() {
        let response = app(&[Role::Student]).oneshot(request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_non_bearer_header_is_unauthorized() {
        let response = app(&[Role::Student])
            .oneshot(request(Some("Basic dXNlcjpwYXNz".to_string())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_refresh_token_is_rejected() {
        let pair = issue_token_pair(Uuid::new_v4(), Role::Student, SECRET).unwrap();

        let response = app(&[Role::Student])
            .oneshot(request(Some(format!("Bearer {}", pair.refresh_token))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_disallowed_role_is_forbidden() {
        let pair = issue_token_pair(Uuid::new_v4(), Role::Student, SECRET).unwrap();

        let response = app(&[Role::Instructor, Role::Admin])
            .oneshot(request(Some(format!("Bearer {}", pair.access_token))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_allowed_role_reaches_handler() {
        let pair = issue_token_pair(Uuid::new_v4(), Role::Instructor, SECRET).unwrap();

        let response = app(&[Role::Instructor, Role::Admin])
            .oneshot(request(Some(format!("Bearer {}", pair.access_token))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"instructor");
    }

    #[tokio::test]
    async fn test_router_outlives_secret_source() {
        let app = {
            let config_secret = String::from(SECRET);
            Router::new()
                .route("/whoami", get(whoami))
                .route_layer(middleware::from_fn(create_jwt_middleware(config_secret.clone())))
        };
        let pair = issue_token_pair(Uuid::new_v4(), Role::Student, SECRET).unwrap();

        let response = tokio::spawn(
            app.oneshot(request(Some(format!("Bearer {}", pair.access_token)))),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
