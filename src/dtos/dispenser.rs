use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::dispenser::Dispenser;

/// No fuel type here: a dispenser pumps whatever its tank holds.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateDispenserRequest {
    #[validate(length(min = 1, max = 20, message = "Code must be 1-20 characters"))]
    pub code: String,
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    pub tank_id: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDispenserRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: Option<String>,
    pub tank_id: Option<i64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct DispenserResponse {
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

impl From<Dispenser> for DispenserResponse {
    fn from(d: Dispenser) -> Self {
        Self {
            id: d.id,
            code: d.code,
            name: d.name,
            tank_id: d.tank_id,
            tank_code: d.tank_code,
            fuel_type_id: d.fuel_type_id,
            fuel_type_name: d.fuel_type_name,
            is_active: d.is_active,
            created_at: d.created_at,
        }
    }
}
