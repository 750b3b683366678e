/// HTTP route handlers
///
/// Handlers parse and validate request bodies, check ownership where a role
/// alone is not enough, and delegate to the models in `yogaguru_shared`.

pub mod attendance;
pub mod auth;
pub mod courses;
pub mod enrollments;
pub mod health;
pub mod payments;
pub mod users;
