/// Startup tasks run before the server accepts requests

use crate::config::BootstrapAdmin;
use sqlx::PgPool;
use yogaguru_shared::{
    auth::password::hash_password,
    models::user::{CreateUser, Role, User},
};

/// Display name given to the bootstrapped admin
pub const ADMIN_NAME: &str = "Administrator";

/// Creates the configured admin account unless a user with that phone exists
///
/// Returns true if an account was created. An existing user is left untouched,
/// whatever its role.
pub async fn ensure_admin(pool: &PgPool, admin: &BootstrapAdmin) -> anyhow::Result<bool> {
    if let Some(existing) = User::find_by_phone(pool, &admin.phone).await? {
        if existing.role != Role::Admin {
            tracing::warn!(
                user_id = %existing.id,
                role = %existing.role,
                "ADMIN_PHONE belongs to a non-admin user, skipping admin bootstrap"
            );
        }
        return Ok(false);
    }

    let password_hash = hash_password(&admin.password)?;

    let user = User::create(
        pool,
        CreateUser {
            phone: admin.phone.clone(),
            password_hash,
            role: Role::Admin,
            name: ADMIN_NAME.to_string(),
            gender: None,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, "Created bootstrap admin account");

    Ok(true)
}
