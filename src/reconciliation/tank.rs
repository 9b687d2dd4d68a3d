//! Expected vs. measured tank levels.

/// Reconciled levels for one tank over a shift.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TankLevels {
    pub calculated_level: f64,
    pub difference: Option<f64>,
    pub difference_percent: Option<f64>,
}

/// `calculated = start + refills - usage`; the difference against a physical
/// dip is informational only.
///
/// The percentage is left empty when the calculated level is zero.
pub fn levels(start_level: f64, total_refills: f64, total_usage: f64, actual_level: Option<f64>) -> TankLevels {
    let calculated_level = start_level + total_refills - total_usage;
    let difference = actual_level.map(|actual| actual - calculated_level);
    let difference_percent = match difference {
        Some(diff) if calculated_level != 0.0 => Some(diff / calculated_level * 100.0),
        _ => None,
    };

    TankLevels {
        calculated_level,
        difference,
        difference_percent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciliation::meter;

    #[test]
    fn usage_includes_test_and_non_sale_withdrawals() {
        let liters = meter::total_liters(1000.0, Some(1500.0), 5.0, 10.0);
        let usage = meter::tank_usage(liters, 5.0, 10.0);
        let result = levels(5000.0, 0.0, usage, None);
        assert_eq!(result.calculated_level, 4500.0);
        assert_eq!(result.difference, None);
        assert_eq!(result.difference_percent, None);
    }

    #[test]
    fn refills_raise_the_expected_level() {
        let result = levels(2000.0, 3000.0, 1200.0, None);
        assert_eq!(result.calculated_level, 3800.0);
    }

    #[test]
    fn measured_shortfall_reports_negative_difference() {
        let result = levels(5000.0, 0.0, 1000.0, Some(3960.0));
        assert_eq!(result.calculated_level, 4000.0);
        assert_eq!(result.difference, Some(-40.0));
        let percent = result.difference_percent.unwrap();
        assert!((percent + 1.0).abs() < 1e-9);
    }

    #[test]
    fn empty_expected_level_skips_percentage() {
        let result = levels(100.0, 0.0, 100.0, Some(3.0));
        assert_eq!(result.difference, Some(3.0));
        assert_eq!(result.difference_percent, None);
    }
}
