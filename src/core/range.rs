//! Small numeric helpers for working with value ranges

use crate::core::error::AnalysisError;

/// Midpoint of `[a, b]`
pub fn center_of_range(a: f64, b: f64) -> f64 {
    (a + b) / 2.0
}

/// Fractional position of `value` between `low` and `high` (0 at `low`, 1 at `high`)
pub fn percent_within_range(value: f64, low: f64, high: f64) -> Result<f64, AnalysisError> {
    if high == low {
        return Err(AnalysisError::ZeroWidthRange { low, high });
    }
    Ok((value - low) / (high - low))
}

/// Map `value` from `[from_low, from_high]` onto `[to_low, to_high]` linearly
pub fn equivalent_value_in_new_range(
    value: f64,
    from_low: f64,
    from_high: f64,
    to_low: f64,
    to_high: f64,
) -> Result<f64, AnalysisError> {
    if to_high == to_low {
        return Err(AnalysisError::ZeroWidthRange {
            low: to_low,
            high: to_high,
        });
    }
    let fraction = percent_within_range(value, from_low, from_high)?;
    Ok(to_low + fraction * (to_high - to_low))
}

/// Whether `value` lies within the closed interval spanned by `a` and `b`, in either order
pub fn between_inclusive(value: f64, a: f64, b: f64) -> bool {
    value >= a.min(b) && value <= a.max(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_center_of_range() {
        assert_eq!(center_of_range(4.8, 7.2), 6.0);
        assert_eq!(center_of_range(-4.0, -8.0), -6.0);
    }

    #[test]
    fn test_equivalent_value_maps_linearly() {
        let mapped = equivalent_value_in_new_range(0.5, 0.0, 1.0, 10.0, 20.0).unwrap();
        assert_relative_eq!(mapped, 15.0, epsilon = 1e-12);

        // Descending source range
        let mapped = equivalent_value_in_new_range(3.0, 4.0, 2.0, 0.0, 1.0).unwrap();
        assert_relative_eq!(mapped, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_equivalent_value_rejects_zero_width() {
        assert!(matches!(
            equivalent_value_in_new_range(1.0, 2.0, 2.0, 0.0, 1.0),
            Err(AnalysisError::ZeroWidthRange { .. })
        ));
        assert!(equivalent_value_in_new_range(1.0, 0.0, 2.0, 3.0, 3.0).is_err());
    }

    #[test]
    fn test_between_inclusive_ignores_bound_order() {
        assert!(between_inclusive(-5.0, -4.8, -7.3));
        assert!(between_inclusive(-4.8, -4.8, -7.3));
        assert!(between_inclusive(6.0, 4.8, 7.3));
        assert!(!between_inclusive(-8.0, -4.8, -7.3));
        assert!(!between_inclusive(7.31, 7.3, 4.8));
    }
}
