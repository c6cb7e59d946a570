use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Rounds to two decimal places, half away from zero.
///
/// The value is rounded as it prints (its shortest decimal form), so
/// `1.005` becomes `1.01` even though the nearest `f64` sits just below it.
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }

    match Decimal::from_str(&value.to_string()) {
        Ok(d) => d
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            .to_string()
            .parse()
            .unwrap_or(value),
        // out of Decimal range; plain f64 rounding is as good as it gets there
        Err(_) => (value * 100.0).round() / 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::round2;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round2(1.005), 1.01);
        assert_eq!(round2(2.675), 2.68);
        assert_eq!(round2(-1.005), -1.01);
        assert_eq!(round2(0.125), 0.13);
    }

    #[test]
    fn keeps_values_already_at_two_places() {
        assert_eq!(round2(4000.0), 4000.0);
        assert_eq!(round2(1234.56), 1234.56);
        assert_eq!(round2(0.0), 0.0);
    }

    #[test]
    fn truncates_below_midpoint() {
        assert_eq!(round2(3333.333333), 3333.33);
        assert_eq!(round2(6666.666666), 6666.67);
    }

    #[test]
    fn passes_non_finite_through() {
        assert!(round2(f64::NAN).is_nan());
        assert_eq!(round2(f64::INFINITY), f64::INFINITY);
    }
}
