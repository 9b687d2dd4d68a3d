//! Dispenser meter arithmetic for a single shift.

/// Liters sold through a dispenser during a shift.
///
/// `None` while the meter is still open (no end reading). No floor is applied:
/// a misconfigured reading yields a negative volume.
pub fn total_liters(
    start_reading: f64,
    end_reading: Option<f64>,
    test_liters: f64,
    usage_liters: f64,
) -> Option<f64> {
    end_reading.map(|end| end - start_reading - test_liters - usage_liters)
}

/// Sale value of the dispensed volume at the shift price, minus the discount.
///
/// Stays `None` when either the volume or the shift price is unknown.
pub fn total_amount(total_liters: Option<f64>, shift_price: Option<f64>, discount: f64) -> Option<f64> {
    match (total_liters, shift_price) {
        (Some(liters), Some(price)) => Some(liters * price - discount),
        _ => None,
    }
}

/// Fuel physically drawn from the tank by this reading.
pub fn tank_usage(total_liters: Option<f64>, test_liters: f64, usage_liters: f64) -> f64 {
    total_liters.unwrap_or(0.0) + test_liters + usage_liters
}

/// Computed columns for one meter reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterTotals {
    pub total_liters: Option<f64>,
    pub total_amount: Option<f64>,
}

impl MeterTotals {
    pub fn compute(
        start_reading: f64,
        end_reading: Option<f64>,
        test_liters: f64,
        usage_liters: f64,
        discount: f64,
        shift_price: Option<f64>,
    ) -> Self {
        let total_liters = total_liters(start_reading, end_reading, test_liters, usage_liters);
        Self {
            total_liters,
            total_amount: total_amount(total_liters, shift_price, discount),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_meter_subtracts_test_and_usage() {
        let totals = MeterTotals::compute(1000.0, Some(1500.0), 5.0, 10.0, 0.0, Some(30.0));
        assert_eq!(totals.total_liters, Some(485.0));
        assert_eq!(totals.total_amount, Some(14_550.0));
    }

    #[test]
    fn open_meter_has_no_totals() {
        let totals = MeterTotals::compute(1000.0, None, 5.0, 10.0, 0.0, Some(30.0));
        assert_eq!(totals.total_liters, None);
        assert_eq!(totals.total_amount, None);
    }

    #[test]
    fn unpriced_fuel_leaves_amount_empty() {
        let totals = MeterTotals::compute(0.0, Some(100.0), 0.0, 0.0, 0.0, None);
        assert_eq!(totals.total_liters, Some(100.0));
        assert_eq!(totals.total_amount, None);
    }

    #[test]
    fn discount_reduces_amount() {
        assert_eq!(total_amount(Some(10.0), Some(35.0), 20.0), Some(330.0));
    }

    #[test]
    fn negative_volume_is_not_floored() {
        assert_eq!(total_liters(1000.0, Some(990.0), 0.0, 5.0), Some(-15.0));
    }

    #[test]
    fn tank_usage_counts_withdrawals_on_open_meter() {
        assert_eq!(tank_usage(None, 5.0, 10.0), 15.0);
        assert_eq!(tank_usage(Some(485.0), 5.0, 10.0), 500.0);
    }
}
