/// Payment endpoints
///
/// Students record payments against their own enrollments; they start as
/// `pending` and an admin settles them.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, AppJson},
    routes::enrollments::load_owned,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;
use yogaguru_shared::{
    auth::middleware::AuthContext,
    models::payment::{
        CreatePayment, Payment, PaymentMethod, PaymentStatus, AMOUNT_SCALE, MAX_AMOUNT,
    },
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaymentRequest {
    pub amount: Decimal,

    /// `card`, `cash`, `bank_transfer` or `online_payment`
    pub method: String,

    #[validate(length(min = 1, max = 100, message = "Transaction ID must be between 1 and 100 characters"))]
    pub transaction_id: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePaymentStatusRequest {
    pub status: String,
}

impl CreatePaymentRequest {
    fn into_payment(self, enrollment_id: Uuid) -> ApiResult<CreatePayment> {
        self.validate()?;

        if self.amount <= Decimal::ZERO {
            return Err(ApiError::BadRequest(
                "amount must be greater than zero".to_string(),
            ));
        }
        if self.amount > MAX_AMOUNT {
            return Err(ApiError::BadRequest(format!(
                "amount must not exceed {}",
                MAX_AMOUNT
            )));
        }
        if self.amount.normalize().scale() > AMOUNT_SCALE {
            return Err(ApiError::BadRequest(format!(
                "amount must have at most {} decimal places",
                AMOUNT_SCALE
            )));
        }

        let method: PaymentMethod = self.method.parse()?;

        Ok(CreatePayment {
            enrollment_id,
            amount: self.amount,
            method,
            transaction_id: self.transaction_id,
        })
    }
}

/// Records a pending payment for an enrollment
///
/// # Errors
///
/// - `400 Bad Request`: amount not positive, too large or too precise, or unknown method
/// - `409 Conflict`: transaction ID already recorded
pub async fn create_payment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(enrollment_id): Path<Uuid>,
    AppJson(req): AppJson<CreatePaymentRequest>,
) -> ApiResult<(StatusCode, AppJson<Payment>)> {
    let enrollment = load_owned(&state, &auth, enrollment_id).await?;

    let payment = Payment::create(&state.db, req.into_payment(enrollment.id)?).await?;

    Ok((StatusCode::CREATED, AppJson(payment)))
}

pub async fn list_payments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(enrollment_id): Path<Uuid>,
) -> ApiResult<AppJson<Vec<Payment>>> {
    let enrollment = load_owned(&state, &auth, enrollment_id).await?;

    let payments = Payment::list_for_enrollment(&state.db, enrollment.id).await?;

    Ok(AppJson(payments))
}

pub async fn update_payment_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(payment_id): Path<Uuid>,
    AppJson(req): AppJson<UpdatePaymentStatusRequest>,
) -> ApiResult<AppJson<Payment>> {
    let status: PaymentStatus = req.status.parse()?;

    let payment = Payment::update_status(&state.db, payment_id, status)
        .await?
        .ok_or_else(|| ApiError::not_found("Payment"))?;

    tracing::info!(admin_id = %auth.user_id, %payment_id, ?status, "Updated payment status");

    Ok(AppJson(payment))
}
