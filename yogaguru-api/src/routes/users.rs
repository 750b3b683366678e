/// User endpoints
///
/// - `GET /users/me`: profile of the caller
/// - `PUT /users/:id/role`: change a role (admin)
/// - `DELETE /users/:id`: soft delete (admin)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, AppJson},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension,
};
use serde::Deserialize;
use uuid::Uuid;
use yogaguru_shared::{
    auth::middleware::AuthContext,
    models::user::{ProfileView, Role, User},
};

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}

pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<AppJson<ProfileView>> {
    let profile = User::profile_view(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    Ok(AppJson(profile))
}

/// Changes a user's role
///
/// The new role shows up in the user's tokens on their next login or refresh.
pub async fn update_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(user_id): Path<Uuid>,
    AppJson(req): AppJson<UpdateRoleRequest>,
) -> ApiResult<AppJson<User>> {
    let role: Role = req.role.parse()?;

    let user = User::update_role(&state.db, user_id, role)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    tracing::info!(admin_id = %auth.user_id, %user_id, %role, "Changed user role");

    Ok(AppJson(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if user_id == auth.user_id {
        return Err(ApiError::BadRequest(
            "Admins cannot delete their own account".to_string(),
        ));
    }

    if !User::soft_delete(&state.db, user_id).await? {
        return Err(ApiError::not_found("User"));
    }

    tracing::info!(admin_id = %auth.user_id, %user_id, "Deleted user");

    Ok(StatusCode::NO_CONTENT)
}
