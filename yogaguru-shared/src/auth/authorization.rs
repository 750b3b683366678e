/// Role and ownership checks
///
/// Roles are flat: there is no hierarchy between instructor and student. The only
/// special case is that admins bypass every ownership check.
///
/// Role gating for whole route groups happens in
/// [`create_role_middleware`](super::middleware::create_role_middleware); the
/// functions here are called from handlers once the resource is loaded.
///
/// # Example
///
/// ```
/// use yogaguru_shared::auth::authorization::{require_any_role, require_ownership};
/// use yogaguru_shared::auth::middleware::AuthContext;
/// use yogaguru_shared::models::user::Role;
/// use uuid::Uuid;
///
/// let instructor = AuthContext::new(Uuid::new_v4(), Role::Instructor);
/// assert!(require_any_role(&instructor, &[Role::Instructor, Role::Admin]).is_ok());
///
/// // instructors can only touch their own courses
/// assert!(require_ownership(&instructor, Uuid::new_v4()).is_err());
/// assert!(require_ownership(&instructor, instructor.user_id).is_ok());
/// ```

use uuid::Uuid;

use super::middleware::AuthContext;
use crate::models::user::Role;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Caller's role is not in the allowed set
    #[error("Insufficient permissions: role {actual} is not allowed")]
    InsufficientRole { actual: Role },

    /// Caller does not own the resource
    #[error("Not authorized to access this resource")]
    NotOwner,
}

/// Requires the caller's role to be one of `allowed`
pub fn require_any_role(auth: &AuthContext, allowed: &[Role]) -> Result<(), AuthzError> {
    if allowed.contains(&auth.role) {
        Ok(())
    } else {
        Err(AuthzError::InsufficientRole { actual: auth.role })
    }
}

/// Requires the caller to be an admin
pub fn require_admin(auth: &AuthContext) -> Result<(), AuthzError> {
    require_any_role(auth, &[Role::Admin])
}

/// Requires the caller to own the resource, unless they are an admin
///
/// Used for courses (owner = instructor) and enrollments (owner = student).
pub fn require_ownership(auth: &AuthContext, owner_id: Uuid) -> Result<(), AuthzError> {
    require_any_ownership(auth, &[owner_id])
}

/// Requires the caller to be one of several owners, unless they are an admin
///
/// Attendance history, for example, is visible to both the enrolled student and
/// the course's instructor.
pub fn require_any_ownership(auth: &AuthContext, owner_ids: &[Uuid]) -> Result<(), AuthzError> {
    if auth.is_admin() || owner_ids.contains(&auth.user_id) {
        Ok(())
    } else {
        Err(AuthzError::NotOwner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(role: Role) -> AuthContext {
        AuthContext::new(Uuid::new_v4(), role)
    }

    #[test]
    fn test_require_any_role() {
        let allowed = [Role::Student, Role::Admin];

        assert!(require_any_role(&ctx(Role::Student), &allowed).is_ok());
        assert!(require_any_role(&ctx(Role::Admin), &allowed).is_ok());
        assert!(matches!(
            require_any_role(&ctx(Role::Instructor), &allowed),
            Err(AuthzError::InsufficientRole { actual: Role::Instructor })
        ));
    }

    #[test]
    fn test_require_admin() {
        assert!(require_admin(&ctx(Role::Admin)).is_ok());
        assert!(require_admin(&ctx(Role::Instructor)).is_err());
        assert!(require_admin(&ctx(Role::Student)).is_err());
    }

    #[test]
    fn test_require_ownership() {
        let owner = ctx(Role::Instructor);
        let other = ctx(Role::Instructor);

        assert!(require_ownership(&owner, owner.user_id).is_ok());
        assert!(matches!(
            require_ownership(&other, owner.user_id),
            Err(AuthzError::NotOwner)
        ));
    }

    #[test]
    fn test_admin_bypasses_ownership() {
        let admin = ctx(Role::Admin);

        assert!(require_ownership(&admin, Uuid::new_v4()).is_ok());
        assert!(require_any_ownership(&admin, &[]).is_ok());
    }

    #[test]
    fn test_require_any_ownership() {
        let student = ctx(Role::Student);
        let instructor = ctx(Role::Instructor);
        let stranger = ctx(Role::Student);
        let owners = [student.user_id, instructor.user_id];

        assert!(require_any_ownership(&student, &owners).is_ok());
        assert!(require_any_ownership(&instructor, &owners).is_ok());
        assert!(require_any_ownership(&stranger, &owners).is_err());
    }

    #[test]
    fn test_authz_error_display() {
        let err = AuthzError::InsufficientRole { actual: Role::Student };
        assert_eq!(err.to_string(), "Insufficient permissions: role student is not allowed");

        assert_eq!(AuthzError::NotOwner.to_string(), "Not authorized to access this resource");
    }
}
