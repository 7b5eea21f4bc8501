//! American / decimal odds conversions

/// Largest absolute American price accepted by default
pub const DEFAULT_MAX_ABS_AMERICAN: f64 = 10_000.0;

/// Convert American odds to decimal odds
///
/// `+150` → 2.5, `-200` → 1.5. Zero has no decimal equivalent and yields NaN.
pub fn american_to_decimal(american: f64) -> f64 {
    if american > 0.0 {
        american / 100.0 + 1.0
    } else if american < 0.0 {
        100.0 / american.abs() + 1.0
    } else {
        f64::NAN
    }
}

/// Implied probability of decimal odds
pub fn decimal_to_implied(decimal: f64) -> f64 {
    1.0 / decimal
}

/// Convert American odds to implied probability
pub fn american_to_implied(american: f64) -> f64 {
    decimal_to_implied(american_to_decimal(american))
}

/// Whether `american` is a usable price: finite, at least ±100 and within
/// `max_abs`. Prices inside (-100, 100) are not valid American odds.
pub fn is_valid_american(american: f64, max_abs: f64) -> bool {
    american.is_finite() && american.abs() >= 100.0 && american.abs() <= max_abs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_american_to_decimal_positive() {
        assert!((american_to_decimal(150.0) - 2.5).abs() < 1e-12);
        assert!((american_to_decimal(100.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_american_to_decimal_negative() {
        assert!((american_to_decimal(-200.0) - 1.5).abs() < 1e-12);
        assert!((american_to_decimal(-100.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_implied_probability() {
        // -200 is a 66.67% favourite
        let prob = american_to_implied(-200.0);
        assert!(prob > 0.66 && prob < 0.67);
        assert!((american_to_implied(100.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_zero_is_not_a_price() {
        assert!(american_to_decimal(0.0).is_nan());
        assert!(!is_valid_american(0.0, DEFAULT_MAX_ABS_AMERICAN));
    }

    #[test]
    fn test_validity_bounds() {
        assert!(is_valid_american(-110.0, DEFAULT_MAX_ABS_AMERICAN));
        assert!(is_valid_american(10_000.0, DEFAULT_MAX_ABS_AMERICAN));
        assert!(!is_valid_american(50.0, DEFAULT_MAX_ABS_AMERICAN));
        assert!(!is_valid_american(-15_000.0, DEFAULT_MAX_ABS_AMERICAN));
        assert!(!is_valid_american(f64::NAN, DEFAULT_MAX_ABS_AMERICAN));
    }
}
