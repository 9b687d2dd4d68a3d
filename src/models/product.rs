use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, FromRow)]
pub struct Product {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub unit: String,
    pub is_active: bool,
    pub current_price: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct ProductPrice {
    pub id: i64,
    pub product_id: i64,
    pub price: f64,
    pub effective_from: DateTime<Utc>,
    pub effective_to: Option<DateTime<Utc>>,
}
