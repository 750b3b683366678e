/// Payments recorded against enrollments
///
/// Payments start as `pending`; an admin moves them to another status once the
/// money has (or has not) arrived. `transaction_id` is the external reference
/// and is unique across all payments.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE payment_status AS ENUM ('pending', 'succeeded', 'failed', 'refunded');
/// CREATE TYPE payment_method AS ENUM ('card', 'cash', 'bank_transfer', 'online_payment');
///
/// CREATE TABLE payments (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     enrollment_id UUID NOT NULL REFERENCES enrollments(id) ON DELETE CASCADE,
///     amount NUMERIC(14, 4) NOT NULL CHECK (amount > 0),
///     status payment_status NOT NULL DEFAULT 'pending',
///     method payment_method NOT NULL,
///     transaction_id VARCHAR(100) NOT NULL,
///     payment_date TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT payments_transaction_id_key UNIQUE (transaction_id)
/// );
/// ```

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::ParseEnumError;

pub const TRANSACTION_ID_CONSTRAINT: &str = "payments_transaction_id_key";

/// Largest amount that fits `NUMERIC(14, 4)`
// 99_999_999_999_999 scale 4; `Decimal::new` is not const.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0x107A_3FFF, 0x5AF3, 0, false, 4);

/// Decimal places kept for amounts, matching exact package totals
pub const AMOUNT_SCALE: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Succeeded,
    Failed,
    Refunded,
}

impl FromStr for PaymentStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "succeeded" => Ok(PaymentStatus::Succeeded),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(ParseEnumError::new("payment status", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Cash,
    BankTransfer,
    OnlinePayment,
}

impl FromStr for PaymentMethod {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(PaymentMethod::Card),
            "cash" => Ok(PaymentMethod::Cash),
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            "online_payment" => Ok(PaymentMethod::OnlinePayment),
            other => Err(ParseEnumError::new("payment method", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub enrollment_id: Uuid,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub method: PaymentMethod,
    pub transaction_id: String,
    pub payment_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreatePayment {
    pub enrollment_id: Uuid,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub transaction_id: String,
}

impl Payment {
    /// Records a pending payment
    ///
    /// # Errors
    ///
    /// Returns a unique violation on `payments_transaction_id_key` for a reused
    /// transaction ID.
    pub async fn create(pool: &PgPool, data: CreatePayment) -> Result<Self, sqlx::Error> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (enrollment_id, amount, method, transaction_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, enrollment_id, amount, status, method, transaction_id,
                      payment_date, created_at
            "#,
        )
        .bind(data.enrollment_id)
        .bind(data.amount)
        .bind(data.method)
        .bind(data.transaction_id)
        .fetch_one(pool)
        .await?;

        tracing::info!(payment_id = %payment.id, enrollment_id = %payment.enrollment_id, "Recorded payment");

        Ok(payment)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, enrollment_id, amount, status, method, transaction_id,
                   payment_date, created_at
            FROM payments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(payment)
    }

    pub async fn list_for_enrollment(
        pool: &PgPool,
        enrollment_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, enrollment_id, amount, status, method, transaction_id,
                   payment_date, created_at
            FROM payments
            WHERE enrollment_id = $1
            ORDER BY payment_date DESC, id
            "#,
        )
        .bind(enrollment_id)
        .fetch_all(pool)
        .await?;

        Ok(payments)
    }

    /// Sets the status of a payment, returning `None` if it does not exist
    pub async fn update_status(
        pool: &PgPool,
        id: Uuid,
        status: PaymentStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments
            SET status = $2
            WHERE id = $1
            RETURNING id, enrollment_id, amount, status, method, transaction_id,
                      payment_date, created_at
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_optional(pool)
        .await?;

        Ok(payment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_method_parse() {
        assert_eq!("card".parse::<PaymentMethod>().unwrap(), PaymentMethod::Card);
        assert_eq!(
            "bank_transfer".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::BankTransfer
        );
        assert_eq!(
            "online_payment".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::OnlinePayment
        );
        assert_eq!(
            "cheque".parse::<PaymentMethod>().unwrap_err().to_string(),
            "invalid payment method: cheque"
        );
    }

    #[test]
    fn test_payment_status_parse() {
        for (s, status) in [
            ("pending", PaymentStatus::Pending),
            ("succeeded", PaymentStatus::Succeeded),
            ("failed", PaymentStatus::Failed),
            ("refunded", PaymentStatus::Refunded),
        ] {
            assert_eq!(s.parse::<PaymentStatus>().unwrap(), status);
        }
        assert!("paid".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn test_payment_method_serde() {
        assert_eq!(
            serde_json::to_string(&PaymentMethod::OnlinePayment).unwrap(),
            "\"online_payment\""
        );
    }
}
