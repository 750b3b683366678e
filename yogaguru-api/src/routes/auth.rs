/// Authentication endpoints
///
/// - `POST /register`: create a student or instructor account
/// - `POST /login`: exchange phone and password for tokens
/// - `POST /refresh`: exchange a refresh token for a fresh pair
///
/// Tokens are always issued with the user's role as stored in the database, so
/// a refresh after an admin changed the role picks up the new role.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, AppJson, ValidationErrorDetail},
};
use axum::{extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};
use yogaguru_shared::{
    auth::{jwt, password},
    models::user::{CreateUser, Gender, Role, User},
};

/// Checks an E.164 phone number: `+`, a non-zero digit, 8 to 15 digits in total
pub(crate) fn validate_e164(phone: &str) -> Result<(), ValidationError> {
    let valid = phone
        .strip_prefix('+')
        .filter(|digits| (8..=15).contains(&digits.len()))
        .filter(|digits| digits.bytes().all(|b| b.is_ascii_digit()))
        .is_some_and(|digits| !digits.starts_with('0'));

    if valid {
        Ok(())
    } else {
        let mut err = ValidationError::new("e164");
        err.message = Some("Phone must be in E.164 format, e.g. +15551234567".into());
        Err(err)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,

    #[validate(custom(function = "validate_e164"))]
    pub phone: String,

    pub password: String,

    /// "student" (default) or "instructor"
    pub role: Option<String>,

    /// "male" or "female"
    pub gender: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Phone is required"))]
    pub phone: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Returned by login and refresh
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub role: Role,
}

impl RegisterRequest {
    /// Trims the display name so length limits apply to what gets stored
    fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            ..self
        }
    }

    fn role(&self) -> ApiResult<Role> {
        let role = match self.role.as_deref() {
            None | Some("") => Role::Student,
            Some(value) => value.parse::<Role>()?,
        };

        if !role.is_self_assignable() {
            return Err(ApiError::BadRequest(format!(
                "Role {} cannot be chosen at registration",
                role
            )));
        }

        Ok(role)
    }

    fn gender(&self) -> ApiResult<Option<Gender>> {
        match self.gender.as_deref() {
            None | Some("") => Ok(None),
            Some(value) => Ok(Some(value.parse()?)),
        }
    }
}

/// Registers a new user
///
/// ```text
/// POST /register
///
/// { "name": "Asha", "phone": "+15551234567", "password": "namaste", "role": "student" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: validation failed, unknown role or gender, or `admin` requested
/// - `409 Conflict`: phone already registered
pub async fn register(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegisterRequest>,
) -> ApiResult<(StatusCode, AppJson<RegisterResponse>)> {
    let req = req.normalized();
    req.validate()?;

    password::validate_password_strength(&req.password).map_err(|e| {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "password".to_string(),
            message: e,
        }])
    })?;

    let role = req.role()?;
    let gender = req.gender()?;

    if User::find_by_phone(&state.db, &req.phone).await?.is_some() {
        return Err(ApiError::Conflict("Phone number already registered".to_string()));
    }

    let password_hash = password::hash_password(&req.password)?;

    // a concurrent registration still hits users_phone_key and maps to 409
    let user = User::create(
        &state.db,
        CreateUser {
            phone: req.phone,
            password_hash,
            role,
            name: req.name,
            gender,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, role = %user.role, "User registered");

    Ok((
        StatusCode::CREATED,
        AppJson(RegisterResponse {
            message: "User registered successfully".to_string(),
            user_id: user.id,
        }),
    ))
}

/// Logs a user in
///
/// Unknown phone, wrong password and deleted accounts all give the same 401.
pub async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> ApiResult<AppJson<TokenResponse>> {
    req.validate()?;

    let invalid = || ApiError::Unauthorized("Invalid phone or password".to_string());

    let user = User::find_by_phone(&state.db, &req.phone)
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Login failed: wrong password");
        return Err(invalid());
    }

    let pair = jwt::issue_token_pair(user.id, user.role, state.jwt_secret())?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(AppJson(TokenResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        role: user.role,
    }))
}

/// Issues a new token pair from a refresh token
///
/// # Errors
///
/// - `401 Unauthorized`: token invalid, expired, or an access token
/// - `404 Not Found`: the user no longer exists
pub async fn refresh(
    State(state): State<AppState>,
    AppJson(req): AppJson<RefreshRequest>,
) -> ApiResult<AppJson<TokenResponse>> {
    let user_id = jwt::validate_refresh_token(&req.refresh_token, state.jwt_secret())?;

    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    let pair = jwt::issue_token_pair(user.id, user.role, state.jwt_secret())?;

    Ok(AppJson(TokenResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        role: user.role,
    }))
}
