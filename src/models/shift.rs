use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "shift_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ShiftStatus {
    Active,
    Completed,
    Cancelled,
}

#[derive(Debug, FromRow)]
pub struct Shift {
    pub id: i64,
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: ShiftStatus,
    pub cash_sales: f64,
    pub credit_sales: f64,
    pub total_sales: f64,
    pub opened_by: Option<i64>,
    pub closed_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct ShiftFuelPrice {
    pub fuel_type_id: i64,
    pub fuel_type_name: String,
    pub price: f64,
}

#[derive(Debug, FromRow)]
pub struct MeterReading {
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

#[derive(Debug, FromRow)]
pub struct TankReading {
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

#[derive(Debug, FromRow)]
pub struct TankRefill {
    pub id: i64,
    pub shift_id: i64,
    pub tank_id: i64,
    pub amount: f64,
    pub note: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}
