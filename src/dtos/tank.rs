use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::tank::Tank;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTankRequest {
    #[validate(length(min = 1, max = 20, message = "Code must be 1-20 characters"))]
    pub code: String,
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    pub fuel_type_id: i64,
    #[validate(range(exclusive_min = 0.0, message = "Capacity must be greater than 0"))]
    pub capacity: f64,
    #[validate(range(min = 0.0, message = "Level cannot be negative"))]
    pub current_level: Option<f64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTankRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: Option<String>,
    pub fuel_type_id: Option<i64>,
    #[validate(range(exclusive_min = 0.0, message = "Capacity must be greater than 0"))]
    pub capacity: Option<f64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct TankResponse {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub fuel_type_id: i64,
    pub fuel_type_name: String,
    pub capacity: f64,
    pub current_level: f64,
    pub fill_percent: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Tank> for TankResponse {
    fn from(t: Tank) -> Self {
        let fill_percent = if t.capacity > 0.0 { t.current_level / t.capacity * 100.0 } else { 0.0 };
        Self {
            id: t.id,
            code: t.code,
            name: t.name,
            fuel_type_id: t.fuel_type_id,
            fuel_type_name: t.fuel_type_name,
            capacity: t.capacity,
            current_level: t.current_level,
            fill_percent,
            is_active: t.is_active,
            created_at: t.created_at,
        }
    }
}
