use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::dtos::meter_reading::MeterReadingResponse;
use crate::dtos::tank_reading::{TankReadingResponse, TankRefillResponse};
use crate::models::shift::{Shift, ShiftFuelPrice, ShiftStatus};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateShiftRequest {
    #[validate(length(min = 1, max = 100, message = "Shift name is required"))]
    pub name: String,
    /// Defaults to now.
    pub start_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ListShiftsQuery {
    pub status: Option<ShiftStatus>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ShiftResponse {
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

impl From<Shift> for ShiftResponse {
    fn from(s: Shift) -> Self {
        Self {
            id: s.id,
            name: s.name,
            start_time: s.start_time,
            end_time: s.end_time,
            status: s.status,
            cash_sales: s.cash_sales,
            credit_sales: s.credit_sales,
            total_sales: s.total_sales,
            opened_by: s.opened_by,
            closed_by: s.closed_by,
            created_at: s.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ShiftFuelPriceResponse {
    pub fuel_type_id: i64,
    pub fuel_type_name: String,
    pub price: f64,
}

impl From<ShiftFuelPrice> for ShiftFuelPriceResponse {
    fn from(p: ShiftFuelPrice) -> Self {
        Self {
            fuel_type_id: p.fuel_type_id,
            fuel_type_name: p.fuel_type_name,
            price: p.price,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ShiftPriceEntry {
    pub fuel_type_id: i64,
    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SetShiftPricesRequest {
    #[validate(length(min = 1, message = "At least one price is required"), nested)]
    pub prices: Vec<ShiftPriceEntry>,
}

/// Fuel-side totals over all meter readings of a shift.
#[derive(Debug, Default, Serialize)]
pub struct FuelSummary {
    pub total_liters: f64,
    pub total_amount: f64,
    pub open_meters: i64,
    pub unpriced_meters: i64,
}

#[derive(Debug, Serialize)]
pub struct ShiftDetailResponse {
    #[serde(flatten)]
    pub shift: ShiftResponse,
    pub prices: Vec<ShiftFuelPriceResponse>,
    pub meter_readings: Vec<MeterReadingResponse>,
    pub tank_readings: Vec<TankReadingResponse>,
    pub refills: Vec<TankRefillResponse>,
    pub fuel: FuelSummary,
    pub sales_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_adjustment_needs_entries_with_non_negative_prices() {
        let empty = SetShiftPricesRequest { prices: vec![] };
        assert!(empty.validate().is_err());

        let negative = SetShiftPricesRequest {
            prices: vec![ShiftPriceEntry { fuel_type_id: 1, price: -1.0 }],
        };
        assert!(negative.validate().is_err());

        let ok = SetShiftPricesRequest {
            prices: vec![ShiftPriceEntry { fuel_type_id: 1, price: 32.5 }],
        };
        assert!(ok.validate().is_ok());
    }
}
