use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_type", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentType {
    Cash,
    Credit,
}

#[derive(Debug, FromRow)]
pub struct Sale {
    pub id: i64,
    pub bill_number: String,
    pub shift_id: i64,
    pub payment_type: PaymentType,
    pub debtor_id: Option<i64>,
    pub subtotal: f64,
    pub discount: f64,
    pub total: f64,
    pub note: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct SaleItem {
    pub id: i64,
    pub sale_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub discount: f64,
    pub total: f64,
}
