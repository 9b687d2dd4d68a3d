use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::fuel_type::{FuelPrice, FuelType};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateFuelTypeRequest {
    #[validate(length(min = 1, max = 20, message = "Code must be 1-20 characters"))]
    pub code: String,
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateFuelTypeRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct FuelTypeResponse {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<FuelType> for FuelTypeResponse {
    fn from(f: FuelType) -> Self {
        Self {
            id: f.id,
            code: f.code,
            name: f.name,
            is_active: f.is_active,
            created_at: f.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct FuelPriceUpdate {
    pub fuel_type_id: i64,
    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: f64,
}

/// Bulk price change, applied all-or-nothing.
#[derive(Debug, Deserialize, Validate)]
pub struct BulkFuelPriceRequest {
    #[validate(length(min = 1, message = "At least one price is required"), nested)]
    pub prices: Vec<FuelPriceUpdate>,
    pub effective_from: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct FuelPriceResponse {
    pub id: i64,
    pub fuel_type_id: i64,
    pub fuel_type_name: String,
    pub price: f64,
    pub effective_from: DateTime<Utc>,
}

impl From<FuelPrice> for FuelPriceResponse {
    fn from(p: FuelPrice) -> Self {
        Self {
            id: p.id,
            fuel_type_id: p.fuel_type_id,
            fuel_type_name: p.fuel_type_name,
            price: p.price,
            effective_from: p.effective_from,
        }
    }
}
