use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, FromRow)]
pub struct Tank {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub fuel_type_id: i64,
    pub fuel_type_name: String,
    pub capacity: f64,
    pub current_level: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
