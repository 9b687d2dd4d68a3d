//! Sale totals and per-shift sales aggregation.

use crate::models::sale::PaymentType;

/// One priced line of a sale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricedLine {
    pub quantity: f64,
    pub unit_price: f64,
    pub discount: f64,
}

impl PricedLine {
    pub fn total(&self) -> f64 {
        line_total(self.quantity, self.unit_price, self.discount)
    }
}

/// Rounds to the 2 decimal places money columns are stored with.
pub fn round_money(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Each line is rounded on its own so a sale total always equals the sum of
/// its stored line totals.
pub fn line_total(quantity: f64, unit_price: f64, discount: f64) -> f64 {
    round_money(quantity * unit_price - discount)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SaleTotals {
    pub subtotal: f64,
    pub discount: f64,
    pub total: f64,
}

/// `subtotal = Σ line totals`, `total = subtotal - sale discount`.
pub fn totals(lines: &[PricedLine], sale_discount: f64) -> SaleTotals {
    let subtotal = round_money(lines.iter().map(PricedLine::total).sum());
    let discount = round_money(sale_discount);
    SaleTotals {
        subtotal,
        discount,
        total: round_money(subtotal - discount),
    }
}

/// Whether a new credit sale would push the debtor's balance past its limit.
/// Debtors without a limit are never over it.
pub fn exceeds_credit_limit(balance: f64, sale_total: f64, credit_limit: Option<f64>) -> bool {
    credit_limit.is_some_and(|limit| round_money(balance + sale_total) > limit)
}

/// Cash/credit split of every sale recorded against a shift.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ShiftSalesTotals {
    pub cash_sales: f64,
    pub credit_sales: f64,
    pub total_sales: f64,
}

impl ShiftSalesTotals {
    /// Rebuilds the totals from scratch out of `(payment type, sale total)` pairs.
    pub fn aggregate<I>(sales: I) -> Self
    where
        I: IntoIterator<Item = (PaymentType, f64)>,
    {
        let mut totals = Self::default();
        for (payment_type, total) in sales {
            match payment_type {
                PaymentType::Cash => totals.cash_sales += total,
                PaymentType::Credit => totals.credit_sales += total,
            }
        }
        totals.total_sales = totals.cash_sales + totals.credit_sales;
        totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sale_level_discount_applies_after_lines() {
        let lines = [
            PricedLine { quantity: 10.0, unit_price: 35.0, discount: 0.0 },
            PricedLine { quantity: 1.0, unit_price: 350.0, discount: 50.0 },
        ];
        let result = totals(&lines, 20.0);
        assert_eq!(result.subtotal, 650.0);
        assert_eq!(result.total, 630.0);
    }

    #[test]
    fn single_line_without_discounts() {
        let result = totals(&[PricedLine { quantity: 3.0, unit_price: 12.5, discount: 0.0 }], 0.0);
        assert_eq!(result.subtotal, 37.5);
        assert_eq!(result.total, 37.5);
    }

    #[test]
    fn fractional_lines_round_before_summing() {
        let line = PricedLine { quantity: 0.125, unit_price: 1.0, discount: 0.0 };
        assert_eq!(line.total(), 0.13);

        let result = totals(&[line, line], 0.0);
        assert_eq!(result.subtotal, 0.26);
        assert_eq!(result.total, line.total() + line.total());
    }

    #[test]
    fn subtotal_has_no_float_noise() {
        let lines = [
            PricedLine { quantity: 1.0, unit_price: 0.1, discount: 0.0 },
            PricedLine { quantity: 1.0, unit_price: 0.2, discount: 0.0 },
        ];
        assert_eq!(totals(&lines, 0.0).subtotal, 0.3);
    }

    #[test]
    fn credit_limit_is_inclusive() {
        assert!(!exceeds_credit_limit(800.0, 200.0, Some(1000.0)));
        assert!(exceeds_credit_limit(800.0, 200.01, Some(1000.0)));
        assert!(!exceeds_credit_limit(1_000_000.0, 5.0, None));
    }

    #[test]
    fn shift_totals_split_by_payment_type() {
        let totals = ShiftSalesTotals::aggregate([
            (PaymentType::Cash, 630.0),
            (PaymentType::Credit, 1200.0),
            (PaymentType::Cash, 70.0),
        ]);
        assert_eq!(totals.cash_sales, 700.0);
        assert_eq!(totals.credit_sales, 1200.0);
        assert_eq!(totals.total_sales, totals.cash_sales + totals.credit_sales);
    }

    #[test]
    fn shift_without_sales_is_zero() {
        assert_eq!(ShiftSalesTotals::aggregate(Vec::new()), ShiftSalesTotals::default());
    }
}
