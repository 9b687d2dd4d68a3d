// src/dtos/product.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::product::{Product, ProductPrice};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 30, message = "Code must be 1-30 characters"))]
    pub code: String,
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 20))]
    pub unit: Option<String>,
    /// Opening price, effective immediately.
    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: Option<f64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub unit: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub unit: String,
    pub is_active: bool,
    pub current_price: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            code: product.code,
            name: product.name,
            unit: product.unit,
            is_active: product.is_active,
            current_price: product.current_price,
            created_at: product.created_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductPriceRequest {
    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: f64,
    pub effective_from: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ProductPriceResponse {
    pub id: i64,
    pub product_id: i64,
    pub price: f64,
    pub effective_from: DateTime<Utc>,
    pub effective_to: Option<DateTime<Utc>>,
}

impl From<ProductPrice> for ProductPriceResponse {
    fn from(p: ProductPrice) -> Self {
        Self {
            id: p.id,
            product_id: p.product_id,
            price: p.price,
            effective_from: p.effective_from,
            effective_to: p.effective_to,
        }
    }
}
