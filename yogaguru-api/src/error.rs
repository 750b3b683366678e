/// Error handling for the API server
///
/// Every handler returns `ApiResult<T>`. Domain errors from `yogaguru-shared`
/// convert into [`ApiError`] through `From`, so handlers just use `?`.
///
/// Responses have the shape:
///
/// ```json
/// { "error": "conflict", "message": "Course is full" }
/// ```
///
/// with an optional `details` array for field validation failures.

use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use yogaguru_shared::{
    auth::{authorization::AuthzError, jwt::JwtError, middleware::AuthError, password::PasswordError},
    enrollment::EnrollmentError,
    models::{
        attendance::{AttendanceError, ENROLLMENT_SESSION_CONSTRAINT},
        course::{CourseError, CourseValidationError},
        enrollment::USER_COURSE_CONSTRAINT,
        payment::TRANSACTION_ID_CONSTRAINT,
        schedule::ScheduleError,
        ParseEnumError,
    },
};

/// Unique index on live users' phone numbers
const USERS_PHONE_CONSTRAINT: &str = "users_phone_key";

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    /// 400
    BadRequest(String),

    /// 400 with per-field details
    ValidationError(Vec<ValidationErrorDetail>),

    /// 401
    Unauthorized(String),

    /// 403
    Forbidden(String),

    /// 404
    NotFound(String),

    /// 409, e.g. duplicate phone or full course
    Conflict(String),

    /// 500, message is logged and hidden from the client
    InternalError(String),

    /// 503
    ServiceUnavailable(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable code, e.g. "bad_request"
    pub error: String,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ApiError {
    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound(format!("{} not found", what))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (error_code, message, details) = match self {
            ApiError::BadRequest(msg) => ("bad_request", msg, None),
            ApiError::ValidationError(errors) => (
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::Unauthorized(msg) => ("unauthorized", msg, None),
            ApiError::Forbidden(msg) => ("forbidden", msg, None),
            ApiError::NotFound(msg) => ("not_found", msg, None),
            ApiError::Conflict(msg) => ("conflict", msg, None),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            ApiError::ServiceUnavailable(msg) => ("service_unavailable", msg, None),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// JSON body extractor and response whose rejection is an [`ApiError`]
///
/// Malformed or mistyped bodies become 400 Bad Request instead of axum's
/// default plain-text 4xx.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

impl<T: Serialize> IntoResponse for AppJson<T> {
    fn into_response(self) -> Response {
        Json(self.0).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<ValidationErrorDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));

        ApiError::ValidationError(details)
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                let message = match db_err.constraint() {
                    Some(USERS_PHONE_CONSTRAINT) => "Phone number already registered",
                    Some(USER_COURSE_CONSTRAINT) => "You are already enrolled in this course",
                    Some(TRANSACTION_ID_CONSTRAINT) => "Transaction ID already recorded",
                    Some(ENROLLMENT_SESSION_CONSTRAINT) => {
                        "Attendance already recorded for this session"
                    }
                    _ => "Resource already exists",
                };
                ApiError::Conflict(message.to_string())
            }
            sqlx::Error::Database(db_err) if db_err.is_check_violation() => {
                ApiError::BadRequest(format!(
                    "Constraint violated: {}",
                    db_err.constraint().unwrap_or("check")
                ))
            }
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                ApiError::BadRequest("Referenced resource does not exist".to_string())
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => ApiError::Unauthorized("Missing credentials".to_string()),
            AuthError::InvalidFormat(msg) | AuthError::InvalidToken(msg) => {
                ApiError::Unauthorized(msg)
            }
            AuthError::Forbidden(msg) => ApiError::Forbidden(msg),
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::InsufficientRole { .. } => {
                ApiError::Forbidden("Insufficient permissions".to_string())
            }
            AuthzError::NotOwner => ApiError::Forbidden(err.to_string()),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(msg) => ApiError::InternalError(msg),
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            _ => ApiError::Unauthorized(format!("Invalid token: {}", err)),
        }
    }
}

impl From<EnrollmentError> for ApiError {
    fn from(err: EnrollmentError) -> Self {
        match err {
            EnrollmentError::InvalidEnrollmentType(_) => ApiError::BadRequest(err.to_string()),
            EnrollmentError::CourseNotFound(_) => ApiError::not_found("Course"),
            EnrollmentError::CourseFull | EnrollmentError::AlreadyEnrolled => {
                ApiError::Conflict(err.to_string())
            }
            EnrollmentError::PeriodOutOfRange => ApiError::BadRequest(err.to_string()),
            EnrollmentError::Database(e) => e.into(),
        }
    }
}

impl From<AttendanceError> for ApiError {
    fn from(err: AttendanceError) -> Self {
        match err {
            AttendanceError::EnrollmentNotFound(_) => ApiError::not_found("Enrollment"),
            AttendanceError::OutsidePeriod(_) => ApiError::BadRequest(err.to_string()),
            AttendanceError::SessionsExhausted | AttendanceError::AlreadyRecorded(_) => {
                ApiError::Conflict(err.to_string())
            }
            AttendanceError::Database(e) => e.into(),
        }
    }
}

impl From<ParseEnumError> for ApiError {
    fn from(err: ParseEnumError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<CourseValidationError> for ApiError {
    fn from(err: CourseValidationError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<CourseError> for ApiError {
    fn from(err: CourseError) -> Self {
        match err {
            CourseError::CapacityBelowEnrollment { .. } => ApiError::Conflict(err.to_string()),
            CourseError::Database(e) => e.into(),
        }
    }
}

impl From<ScheduleError> for ApiError {
    fn from(err: ScheduleError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        assert_eq!(ApiError::not_found("Course").to_string(), "Not found: Course not found");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::ValidationError(vec![]).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthorized(String::new()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden(String::new()).status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::Conflict(String::new()).status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::InternalError(String::new()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_internal_error_is_hidden() {
        let (status, body) = body_json(ApiError::InternalError("db password leaked".into())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal_error");
        assert_eq!(body["message"], "An internal error occurred");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn test_validation_error_body() {
        let err = ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "phone".to_string(),
            message: "Phone must be in E.164 format".to_string(),
        }]);
        let (status, body) = body_json(err).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
        assert_eq!(body["details"][0]["field"], "phone");
    }

    #[test]
    fn test_enrollment_error_mapping() {
        let err: ApiError = EnrollmentError::CourseFull.into();
        assert!(matches!(err, ApiError::Conflict(ref m) if m == "Course is full"));

        let err: ApiError = EnrollmentError::AlreadyEnrolled.into();
        assert!(
            matches!(err, ApiError::Conflict(ref m) if m == "You are already enrolled in this course")
        );

        let err: ApiError = EnrollmentError::InvalidEnrollmentType("weekly".into()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err: ApiError = EnrollmentError::CourseNotFound(Uuid::new_v4()).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_course_error_mapping() {
        let err: ApiError = CourseError::CapacityBelowEnrollment {
            capacity: 1,
            enrolled: 2,
        }
        .into();
        assert!(
            matches!(err, ApiError::Conflict(ref m) if m == "capacity 1 is below the 2 current enrollments")
        );

        let err: ApiError = CourseValidationError::PriceTooLarge.into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_auth_error_mapping() {
        let err: ApiError = AuthzError::NotOwner.into();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let err: ApiError = JwtError::Expired.into();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        let err: ApiError = JwtError::CreateError("boom".into()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_row_not_found_maps_to_404() {
        let err: ApiError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_parse_errors_map_to_400() {
        let err: ApiError = ParseEnumError::new("level", "expert").into();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "invalid level: expert"));

        let err: ApiError = ScheduleError::InvalidDayMask(0).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
