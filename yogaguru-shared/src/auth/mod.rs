/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and validation
/// - [`jwt`]: access/refresh token issuance and validation
/// - [`middleware`]: Axum layers for bearer authentication and role gating
/// - [`authorization`]: role and ownership checks used by handlers
///
/// # Example
///
/// ```
/// use yogaguru_shared::auth::password::{hash_password, verify_password};
/// use yogaguru_shared::auth::jwt::{issue_token_pair, validate_refresh_token};
/// use yogaguru_shared::models::user::Role;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let user_id = Uuid::new_v4();
/// let pair = issue_token_pair(user_id, Role::Student, "secret-key")?;
/// assert_eq!(validate_refresh_token(&pair.refresh_token, "secret-key")?, user_id);
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
