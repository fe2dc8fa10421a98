//! Monetary and percentage arithmetic.
//!
//! All amounts are [`Decimal`]. Results that are persisted or compared against
//! a legal ceiling are rounded to two decimal places, midpoint away from zero.

use rust_decimal::{Decimal, RoundingStrategy};

/// Round to cents.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `part / whole × 100`, rounded to two decimals.
///
/// Returns zero when `whole` is not positive: a contract without an original
/// value has no meaningful amendment percentage.
pub fn percent_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    round2(part / whole * Decimal::ONE_HUNDRED)
}

/// `whole × percent / 100`, rounded to two decimals.
pub fn share_of(whole: Decimal, percent: Decimal) -> Decimal {
    round2(whole * percent / Decimal::ONE_HUNDRED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn percent_of_exact() {
        assert_eq!(percent_of(dec!(20000), dec!(100000)), dec!(20.00));
        assert_eq!(percent_of(dec!(1), dec!(3)), dec!(33.33));
        assert_eq!(percent_of(dec!(2), dec!(3)), dec!(66.67));
    }

    #[test]
    fn percent_of_zero_whole_is_zero() {
        assert_eq!(percent_of(dec!(500), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(percent_of(dec!(500), dec!(-10)), Decimal::ZERO);
    }

    #[test]
    fn midpoint_rounds_away_from_zero() {
        assert_eq!(round2(dec!(1.005)), dec!(1.01));
        assert_eq!(round2(dec!(1.004)), dec!(1.00));
    }

    #[test]
    fn share_of_headroom() {
        assert_eq!(share_of(dec!(100000), dec!(5)), dec!(5000));
        assert_eq!(share_of(dec!(333.33), dec!(4.99)), dec!(16.63));
    }
}
