use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::sale::{PaymentType, Sale, SaleItem};

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_debtor_for_credit"))]
pub struct CreateSaleRequest {
    #[validate(length(min = 1, max = 50, message = "Bill number is required"))]
    pub bill_number: String,
    pub shift_id: i64,
    pub payment_type: PaymentType,
    pub debtor_id: Option<i64>,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "Discount cannot be negative"))]
    pub discount: f64,
    #[validate(length(max = 500))]
    pub note: Option<String>,
    #[validate(length(min = 1, message = "Sale must contain at least one item"), nested)]
    pub items: Vec<SaleItemRequest>,
}

fn validate_debtor_for_credit(req: &CreateSaleRequest) -> Result<(), ValidationError> {
    if req.payment_type == PaymentType::Credit && req.debtor_id.is_none() {
        let mut err = ValidationError::new("debtor_required");
        err.message = Some("Credit sales require a debtor".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SaleItemRequest {
    pub product_id: i64,
    #[validate(range(exclusive_min = 0.0, message = "Quantity must be greater than 0"))]
    pub quantity: f64,
    /// Falls back to the product's current price.
    #[validate(range(min = 0.0, message = "Unit price cannot be negative"))]
    pub unit_price: Option<f64>,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "Discount cannot be negative"))]
    pub discount: f64,
}

#[derive(Debug, Deserialize)]
pub struct ListSalesQuery {
    pub shift_id: Option<i64>,
    pub debtor_id: Option<i64>,
    pub payment_type: Option<PaymentType>,
}

#[derive(Debug, Serialize)]
pub struct SaleResponse {
    pub id: i64,
    pub bill_number: String,
    pub shift_id: i64,
    pub payment_type: PaymentType,
    pub debtor_id: Option<i64>,
    pub subtotal: f64,
    pub discount: f64,
    pub total: f64,
    pub note: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<SaleItemResponse>,
}

impl SaleResponse {
    pub fn new(sale: Sale, items: Vec<SaleItem>) -> Self {
        Self {
            id: sale.id,
            bill_number: sale.bill_number,
            shift_id: sale.shift_id,
            payment_type: sale.payment_type,
            debtor_id: sale.debtor_id,
            subtotal: sale.subtotal,
            discount: sale.discount,
            total: sale.total,
            note: sale.note,
            created_by: sale.created_by,
            created_at: sale.created_at,
            items: items.into_iter().map(SaleItemResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SaleItemResponse {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub discount: f64,
    pub total: f64,
}

impl From<SaleItem> for SaleItemResponse {
    fn from(i: SaleItem) -> Self {
        Self {
            id: i.id,
            product_id: i.product_id,
            product_name: i.product_name,
            quantity: i.quantity,
            unit_price: i.unit_price,
            discount: i.discount,
            total: i.total,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SaleListItem {
    pub id: i64,
    pub bill_number: String,
    pub shift_id: i64,
    pub payment_type: PaymentType,
    pub debtor_id: Option<i64>,
    pub total: f64,
    pub created_at: DateTime<Utc>,
}

impl From<Sale> for SaleListItem {
    fn from(s: Sale) -> Self {
        Self {
            id: s.id,
            bill_number: s.bill_number,
            shift_id: s.shift_id,
            payment_type: s.payment_type,
            debtor_id: s.debtor_id,
            total: s.total,
            created_at: s.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(payment_type: PaymentType, debtor_id: Option<i64>, items: Vec<SaleItemRequest>) -> CreateSaleRequest {
        CreateSaleRequest {
            bill_number: "B-0001".into(),
            shift_id: 1,
            payment_type,
            debtor_id,
            discount: 0.0,
            note: None,
            items,
        }
    }

    fn item(quantity: f64) -> SaleItemRequest {
        SaleItemRequest { product_id: 1, quantity, unit_price: Some(35.0), discount: 0.0 }
    }

    #[test]
    fn credit_sale_without_debtor_is_invalid() {
        assert!(request(PaymentType::Credit, None, vec![item(1.0)]).validate().is_err());
        assert!(request(PaymentType::Credit, Some(3), vec![item(1.0)]).validate().is_ok());
    }

    #[test]
    fn cash_sale_needs_no_debtor() {
        assert!(request(PaymentType::Cash, None, vec![item(1.0)]).validate().is_ok());
    }

    #[test]
    fn empty_or_zero_quantity_items_are_invalid() {
        assert!(request(PaymentType::Cash, None, vec![]).validate().is_err());
        assert!(request(PaymentType::Cash, None, vec![item(0.0)]).validate().is_err());
    }

    #[test]
    fn payment_type_parses_uppercase() {
        let req: CreateSaleRequest = serde_json::from_str(
            r#"{"bill_number":"B1","shift_id":1,"payment_type":"CREDIT","debtor_id":2,
                "items":[{"product_id":1,"quantity":2}]}"#,
        )
        .unwrap();
        assert_eq!(req.payment_type, PaymentType::Credit);
        assert_eq!(req.items[0].discount, 0.0);
        assert!(req.items[0].unit_price.is_none());
    }
}
