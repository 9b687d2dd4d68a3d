use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, FromRow)]
pub struct Debtor {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub phone: Option<String>,
    pub credit_limit: Option<f64>,
    pub is_active: bool,
    pub balance: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct DebtorPayment {
    pub id: i64,
    pub debtor_id: i64,
    pub amount: f64,
    pub note: Option<String>,
    pub received_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}
