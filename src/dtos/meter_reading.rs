use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::shift::MeterReading;

/// Upsert payload; one reading per (shift, dispenser).
#[derive(Debug, Deserialize, Validate)]
pub struct UpsertMeterReadingRequest {
    pub dispenser_id: i64,
    /// Keeps the carried-over start value when omitted.
    #[validate(range(min = 0.0, message = "Start reading cannot be negative"))]
    pub start_reading: Option<f64>,
    #[validate(range(min = 0.0, message = "End reading cannot be negative"))]
    pub end_reading: Option<f64>,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "Test liters cannot be negative"))]
    pub test_liters: f64,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "Usage liters cannot be negative"))]
    pub usage_liters: f64,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "Discount cannot be negative"))]
    pub discount: f64,
}

#[derive(Debug, Serialize)]
pub struct MeterReadingResponse {
    pub id: i64,
    pub shift_id: i64,
    pub dispenser_id: i64,
    pub dispenser_code: String,
    pub tank_id: i64,
    pub fuel_type_id: i64,
    pub start_reading: f64,
    pub end_reading: Option<f64>,
    pub test_liters: f64,
    pub usage_liters: f64,
    pub discount: f64,
    pub total_liters: Option<f64>,
    pub total_amount: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

impl From<MeterReading> for MeterReadingResponse {
    fn from(m: MeterReading) -> Self {
        Self {
            id: m.id,
            shift_id: m.shift_id,
            dispenser_id: m.dispenser_id,
            dispenser_code: m.dispenser_code,
            tank_id: m.tank_id,
            fuel_type_id: m.fuel_type_id,
            start_reading: m.start_reading,
            end_reading: m.end_reading,
            test_liters: m.test_liters,
            usage_liters: m.usage_liters,
            discount: m.discount,
            total_liters: m.total_liters,
            total_amount: m.total_amount,
            updated_at: m.updated_at,
        }
    }
}
