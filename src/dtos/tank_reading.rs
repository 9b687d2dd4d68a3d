use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::shift::{TankReading, TankRefill};

/// Tank check: optional physical dip for one tank in a shift.
#[derive(Debug, Deserialize, Validate)]
pub struct UpsertTankReadingRequest {
    pub tank_id: i64,
    #[validate(range(min = 0.0, message = "Measured level cannot be negative"))]
    pub actual_level: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct TankReadingResponse {
    pub id: i64,
    pub shift_id: i64,
    pub tank_id: i64,
    pub tank_code: String,
    pub start_level: f64,
    pub total_refills: f64,
    pub total_usage: f64,
    pub calculated_level: f64,
    pub actual_level: Option<f64>,
    pub difference: Option<f64>,
    pub difference_percent: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

impl From<TankReading> for TankReadingResponse {
    fn from(t: TankReading) -> Self {
        Self {
            id: t.id,
            shift_id: t.shift_id,
            tank_id: t.tank_id,
            tank_code: t.tank_code,
            start_level: t.start_level,
            total_refills: t.total_refills,
            total_usage: t.total_usage,
            calculated_level: t.calculated_level,
            actual_level: t.actual_level,
            difference: t.difference,
            difference_percent: t.difference_percent,
            updated_at: t.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTankRefillRequest {
    pub tank_id: i64,
    #[validate(range(exclusive_min = 0.0, message = "Refill amount must be greater than 0"))]
    pub amount: f64,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TankRefillResponse {
    pub id: i64,
    pub shift_id: i64,
    pub tank_id: i64,
    pub amount: f64,
    pub note: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl From<TankRefill> for TankRefillResponse {
    fn from(r: TankRefill) -> Self {
        Self {
            id: r.id,
            shift_id: r.shift_id,
            tank_id: r.tank_id,
            amount: r.amount,
            note: r.note,
            created_by: r.created_by,
            created_at: r.created_at,
        }
    }
}
