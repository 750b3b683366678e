/// Enrollment endpoints
///
/// Students enroll themselves; admins may act on any enrollment. Creation runs
/// the capacity check and insert under a lock on the course row, so the last
/// seat of a course goes to exactly one caller.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, AppJson},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;
use yogaguru_shared::{
    auth::{authorization::require_ownership, middleware::AuthContext},
    enrollment::PackageType,
    models::enrollment::Enrollment,
};

#[derive(Debug, Deserialize)]
pub struct CreateEnrollmentRequest {
    pub course_id: Uuid,

    /// `pre_session`, `monthly`, `six_month` or `yearly`
    pub enrollment_type: String,
}

/// Loads an enrollment the caller owns (or any enrollment, for admins)
pub(crate) async fn load_owned(
    state: &AppState,
    auth: &AuthContext,
    enrollment_id: Uuid,
) -> ApiResult<Enrollment> {
    let enrollment = Enrollment::find_by_id(&state.db, enrollment_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Enrollment"))?;

    require_ownership(auth, enrollment.user_id)?;

    Ok(enrollment)
}

/// Enrolls the caller in a course
///
/// ```text
/// POST /enrollments
///
/// { "course_id": "…", "enrollment_type": "monthly" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: unknown enrollment type
/// - `404 Not Found`: course does not exist
/// - `409 Conflict`: course is full, or the caller is already enrolled
pub async fn create_enrollment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(req): AppJson<CreateEnrollmentRequest>,
) -> ApiResult<(StatusCode, AppJson<Enrollment>)> {
    let package: PackageType = req.enrollment_type.parse()?;

    let enrollment =
        Enrollment::enroll(&state.db, auth.user_id, req.course_id, package, Utc::now()).await?;

    Ok((StatusCode::CREATED, AppJson(enrollment)))
}

pub async fn my_enrollments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<AppJson<Vec<Enrollment>>> {
    let enrollments = Enrollment::list_for_user(&state.db, auth.user_id).await?;
    Ok(AppJson(enrollments))
}

pub async fn get_enrollment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(enrollment_id): Path<Uuid>,
) -> ApiResult<AppJson<Enrollment>> {
    let enrollment = load_owned(&state, &auth, enrollment_id).await?;
    Ok(AppJson(enrollment))
}

/// Cancels an enrollment, freeing its seat
pub async fn cancel_enrollment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(enrollment_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let enrollment = load_owned(&state, &auth, enrollment_id).await?;

    if !Enrollment::cancel(&state.db, enrollment.id).await? {
        return Err(ApiError::not_found("Enrollment"));
    }

    tracing::info!(%enrollment_id, user_id = %auth.user_id, "Cancelled enrollment");

    Ok(StatusCode::NO_CONTENT)
}
