use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Fuel type columns are read through the owning tank.
#[derive(Debug, FromRow)]
pub struct Dispenser {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub tank_id: i64,
    pub tank_code: String,
    pub fuel_type_id: i64,
    pub fuel_type_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
