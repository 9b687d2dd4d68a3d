use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::debtor::{Debtor, DebtorPayment};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDebtorRequest {
    #[validate(length(min = 1, max = 30, message = "Code must be 1-30 characters"))]
    pub code: String,
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    #[validate(range(min = 0.0, message = "Credit limit cannot be negative"))]
    pub credit_limit: Option<f64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDebtorRequest {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    #[validate(range(min = 0.0, message = "Credit limit cannot be negative"))]
    pub credit_limit: Option<f64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct DebtorResponse {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub phone: Option<String>,
    pub credit_limit: Option<f64>,
    pub is_active: bool,
    pub balance: f64,
    pub created_at: DateTime<Utc>,
}

impl From<Debtor> for DebtorResponse {
    fn from(d: Debtor) -> Self {
        Self {
            id: d.id,
            code: d.code,
            name: d.name,
            phone: d.phone,
            credit_limit: d.credit_limit,
            is_active: d.is_active,
            balance: d.balance,
            created_at: d.created_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDebtorPaymentRequest {
    #[validate(range(exclusive_min = 0.0, message = "Payment must be greater than 0"))]
    pub amount: f64,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DebtorPaymentResponse {
    pub id: i64,
    pub debtor_id: i64,
    pub amount: f64,
    pub note: Option<String>,
    pub received_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl From<DebtorPayment> for DebtorPaymentResponse {
    fn from(p: DebtorPayment) -> Self {
        Self {
            id: p.id,
            debtor_id: p.debtor_id,
            amount: p.amount,
            note: p.note,
            received_by: p.received_by,
            created_at: p.created_at,
        }
    }
}
