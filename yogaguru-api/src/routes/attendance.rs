/// Attendance endpoints
///
/// The course's instructor (or an admin) records attendance. The enrolled
/// student may read it as well.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, AppJson},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;
use yogaguru_shared::{
    auth::{
        authorization::{require_any_ownership, require_ownership},
        middleware::AuthContext,
    },
    models::{attendance::Attendance, course::Course, enrollment::Enrollment},
};

#[derive(Debug, Deserialize)]
pub struct RecordAttendanceRequest {
    pub session_date: NaiveDate,

    #[serde(default = "attended_default")]
    pub attended: bool,
}

fn attended_default() -> bool {
    true
}

/// Loads an enrollment and the instructor of its course
async fn load_with_instructor(state: &AppState, enrollment_id: Uuid) -> ApiResult<(Enrollment, Uuid)> {
    let enrollment = Enrollment::find_by_id(&state.db, enrollment_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Enrollment"))?;

    let course = Course::find_by_id(&state.db, enrollment.course_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Course"))?;

    Ok((enrollment, course.instructor_id))
}

/// Records attendance for one session
///
/// # Errors
///
/// - `400 Bad Request`: date outside the enrollment period
/// - `403 Forbidden`: caller is not the course instructor or an admin
/// - `409 Conflict`: session already recorded, or no sessions left
pub async fn record_attendance(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(enrollment_id): Path<Uuid>,
    AppJson(req): AppJson<RecordAttendanceRequest>,
) -> ApiResult<(StatusCode, AppJson<Attendance>)> {
    let (enrollment, instructor_id) = load_with_instructor(&state, enrollment_id).await?;

    require_ownership(&auth, instructor_id)?;

    let record = Attendance::record(&state.db, enrollment.id, req.session_date, req.attended).await?;

    Ok((StatusCode::CREATED, AppJson(record)))
}

pub async fn list_attendance(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(enrollment_id): Path<Uuid>,
) -> ApiResult<AppJson<Vec<Attendance>>> {
    let (enrollment, instructor_id) = load_with_instructor(&state, enrollment_id).await?;

    require_any_ownership(&auth, &[enrollment.user_id, instructor_id])?;

    let records = Attendance::list_for_enrollment(&state.db, enrollment.id).await?;

    Ok(AppJson(records))
}
