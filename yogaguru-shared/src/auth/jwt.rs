/// JWT token issuance and validation
///
/// Tokens are signed with HS256 and carry the user ID as subject. Access tokens
/// also carry the user's role as a typed claim, so handlers never have to look
/// the role up again or cast it out of an untyped map.
///
/// # Token Types
///
/// - **Access Token**: 24 hours, carries `role`, used as `Authorization: Bearer`
/// - **Refresh Token**: 7 days, no role, exchanged for a fresh pair
///
/// # Example
///
/// ```
/// use yogaguru_shared::auth::jwt::{issue_token_pair, validate_access_token};
/// use yogaguru_shared::models::user::Role;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let user_id = Uuid::new_v4();
/// let pair = issue_token_pair(user_id, Role::Student, "secret")?;
///
/// let access = validate_access_token(&pair.access_token, "secret")?;
/// assert_eq!(access.user_id, user_id);
/// assert_eq!(access.role, Role::Student);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::Role;

/// Issuer claim written into and required from every token
pub const ISSUER: &str = "yogaguru";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to sign a token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Signature does not match the secret
    #[error("Invalid token signature")]
    InvalidSignature,

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Token could not be decoded or is missing required claims
    #[error("Malformed token: {0}")]
    Malformed(String),

    /// An access token was presented where a refresh token was expected, or vice versa
    #[error("Expected {expected} token, got {actual} token")]
    WrongTokenType {
        expected: &'static str,
        actual: &'static str,
    },
}

/// Token type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Access token (24 hours)
    Access,

    /// Refresh token (7 days)
    Refresh,
}

impl TokenType {
    /// Gets default lifetime for the token type
    pub fn default_expiration(&self) -> Duration {
        match self {
            TokenType::Access => Duration::hours(24),
            TokenType::Refresh => Duration::days(7),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// JWT claims
///
/// - `sub`: user ID
/// - `iss`: always "yogaguru"
/// - `iat` / `nbf` / `exp`: Unix timestamps
/// - `role`: present on access tokens only
/// - `token_type`: access or refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,

    pub token_type: TokenType,
}

impl Claims {
    /// Access token claims with the default 24 hour lifetime
    pub fn access(user_id: Uuid, role: Role) -> Self {
        Self::with_expiration(
            user_id,
            Some(role),
            TokenType::Access,
            TokenType::Access.default_expiration(),
        )
    }

    /// Refresh token claims with the default 7 day lifetime
    pub fn refresh(user_id: Uuid) -> Self {
        Self::with_expiration(
            user_id,
            None,
            TokenType::Refresh,
            TokenType::Refresh.default_expiration(),
        )
    }

    /// Creates claims with a custom lifetime
    ///
    /// A negative `expires_in` produces already-expired claims, which is handy in tests.
    pub fn with_expiration(
        user_id: Uuid,
        role: Option<Role>,
        token_type: TokenType,
        expires_in: Duration,
    ) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
            nbf: now.timestamp(),
            role,
            token_type,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Validated contents of an access token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessClaims {
    pub user_id: Uuid,
    pub role: Role,
    pub expires_at: i64,
}

/// A freshly issued access/refresh token pair
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Signs claims with HS256
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&Header::new(Algorithm::HS256), claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Issues an access token (carrying `role`) and a refresh token for a user
pub fn issue_token_pair(user_id: Uuid, role: Role, secret: &str) -> Result<TokenPair, JwtError> {
    Ok(TokenPair {
        access_token: create_token(&Claims::access(user_id, role), secret)?,
        refresh_token: create_token(&Claims::refresh(user_id), secret)?,
    })
}

/// Validates signature, expiry, not-before and issuer, and returns the claims
///
/// # Errors
///
/// - `JwtError::InvalidSignature` if the token was signed with another secret
/// - `JwtError::Expired` if `exp` is in the past
/// - `JwtError::Malformed` for anything else (bad encoding, wrong issuer, missing claims)
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;

    let data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        ErrorKind::InvalidSignature => JwtError::InvalidSignature,
        ErrorKind::ExpiredSignature => JwtError::Expired,
        ErrorKind::InvalidIssuer => JwtError::Malformed("unexpected issuer".to_string()),
        _ => JwtError::Malformed(e.to_string()),
    })?;

    Ok(data.claims)
}

/// Validates an access token and extracts the user and role
pub fn validate_access_token(token: &str, secret: &str) -> Result<AccessClaims, JwtError> {
    let claims = validate_token(token, secret)?;

    if claims.token_type != TokenType::Access {
        return Err(JwtError::WrongTokenType {
            expected: TokenType::Access.as_str(),
            actual: claims.token_type.as_str(),
        });
    }

    let role = claims
        .role
        .ok_or_else(|| JwtError::Malformed("access token has no role claim".to_string()))?;

    Ok(AccessClaims {
        user_id: claims.sub,
        role,
        expires_at: claims.exp,
    })
}

/// Validates a refresh token and returns the subject user ID
///
/// The caller is expected to reload the user and issue a new pair with the
/// user's current role.
pub fn validate_refresh_token(token: &str, secret: &str) -> Result<Uuid, JwtError> {
    let claims = validate_token(token, secret)?;

    if claims.token_type != TokenType::Refresh {
        return Err(JwtError::WrongTokenType {
            expected: TokenType::Refresh.as_str(),
            actual: claims.token_type.as_str(),
        });
    }

    Ok(claims.sub)
}
