use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, FromRow)]
pub struct FuelType {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Latest price per fuel type, joined with the fuel type name.
#[derive(Debug, FromRow)]
pub struct FuelPrice {
    pub id: i64,
    pub fuel_type_id: i64,
    pub fuel_type_name: String,
    pub price: f64,
    pub effective_from: DateTime<Utc>,
}
