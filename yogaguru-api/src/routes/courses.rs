/// Course catalog endpoints
///
/// Reads are public. Instructors create courses they own; only the owning
/// instructor or an admin may change or delete one. Deleting a course also
/// removes its enrollments.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, AppJson},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension,
};
use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use yogaguru_shared::{
    auth::{authorization::require_ownership, middleware::AuthContext},
    models::{
        course::{Course, CourseDetails, CourseLevel, NewCourse, UpdateCourse},
        schedule::{DayMask, NewSchedule, Recurrence},
    },
};

#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    /// Bit 0 = Sunday through bit 6 = Saturday
    pub day_mask: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,

    /// Defaults to weekly
    pub recurrence: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCourseRequest {
    pub title: String,
    pub course_type: String,
    pub level: String,
    pub price: Decimal,
    pub capacity: i32,

    #[serde(default)]
    pub schedules: Vec<ScheduleRequest>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateCourseRequest {
    pub title: Option<String>,
    pub course_type: Option<String>,
    pub level: Option<String>,
    pub price: Option<Decimal>,
    pub capacity: Option<i32>,

    /// Replaces every schedule of the course when present
    pub schedules: Option<Vec<ScheduleRequest>>,
}

impl ScheduleRequest {
    fn parse(&self) -> ApiResult<NewSchedule> {
        let recurrence = match self.recurrence.as_deref() {
            None => Recurrence::Weekly,
            Some(value) => value.parse()?,
        };

        Ok(NewSchedule::new(
            DayMask::new(self.day_mask)?,
            self.start_time,
            self.end_time,
            recurrence,
        )?)
    }
}

fn parse_schedules(schedules: &[ScheduleRequest]) -> ApiResult<Vec<NewSchedule>> {
    schedules.iter().map(ScheduleRequest::parse).collect()
}

impl CreateCourseRequest {
    fn into_new_course(self) -> ApiResult<NewCourse> {
        let course = NewCourse {
            schedules: parse_schedules(&self.schedules)?,
            level: self.level.parse()?,
            title: self.title,
            course_type: self.course_type,
            price: self.price,
            capacity: self.capacity,
        };
        course.validate()?;
        Ok(course)
    }
}

impl UpdateCourseRequest {
    fn into_update(self) -> ApiResult<UpdateCourse> {
        let update = UpdateCourse {
            schedules: self.schedules.as_deref().map(parse_schedules).transpose()?,
            level: self.level.as_deref().map(str::parse::<CourseLevel>).transpose()?,
            title: self.title,
            course_type: self.course_type,
            price: self.price,
            capacity: self.capacity,
        };
        update.validate()?;
        Ok(update)
    }
}

pub async fn list_courses(State(state): State<AppState>) -> ApiResult<AppJson<Vec<CourseDetails>>> {
    let courses = Course::list_details(&state.db).await?;
    Ok(AppJson(courses))
}

pub async fn get_course(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> ApiResult<AppJson<CourseDetails>> {
    let course = Course::find_details(&state.db, course_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Course"))?;

    Ok(AppJson(course))
}

/// Creates a course owned by the caller
///
/// ```text
/// POST /courses
///
/// {
///   "title": "Morning Flow", "course_type": "vinyasa", "level": "beginner",
///   "price": "20.00", "capacity": 12,
///   "schedules": [{ "day_mask": 42, "start_time": "07:00:00", "end_time": "08:00:00" }]
/// }
/// ```
pub async fn create_course(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(req): AppJson<CreateCourseRequest>,
) -> ApiResult<(StatusCode, AppJson<CourseDetails>)> {
    let new_course = req.into_new_course()?;

    let course = Course::create(&state.db, auth.user_id, new_course).await?;

    Ok((StatusCode::CREATED, AppJson(course)))
}

/// Updates a course owned by the caller
///
/// # Errors
///
/// - `400 Bad Request`: invalid field values
/// - `403 Forbidden`: caller neither owns the course nor is an admin
/// - `409 Conflict`: new capacity is below the current enrollment count
pub async fn update_course(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(course_id): Path<Uuid>,
    AppJson(req): AppJson<UpdateCourseRequest>,
) -> ApiResult<AppJson<CourseDetails>> {
    let course = Course::find_by_id(&state.db, course_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Course"))?;

    require_ownership(&auth, course.instructor_id)?;

    let update = req.into_update()?;

    let course = Course::update(&state.db, course_id, update)
        .await?
        .ok_or_else(|| ApiError::not_found("Course"))?;

    Ok(AppJson(course))
}

pub async fn delete_course(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(course_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let course = Course::find_by_id(&state.db, course_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Course"))?;

    require_ownership(&auth, course.instructor_id)?;

    if !Course::delete(&state.db, course_id).await? {
        return Err(ApiError::not_found("Course"));
    }

    Ok(StatusCode::NO_CONTENT)
}
