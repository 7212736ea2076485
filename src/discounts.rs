//! Discount utilities
//!
//! Percentage arithmetic shared by promo codes and tax: rates are held as
//! [`Percentage`] fractions and applied to whole minor units.

use decimal_percentage::Percentage;
use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};
use thiserror::Error;

/// Errors specific to percentage calculations.
#[derive(Debug, Error, PartialEq)]
pub enum DiscountError {
    /// Percentage calculation could not be safely converted.
    #[error("percentage conversion overflowed or was not finite")]
    PercentConversion,

    /// A rate fell outside the half-open range `[0, 1)`.
    #[error("rate {0} is outside [0, 1)")]
    RateOutOfRange(Decimal),
}

/// Calculate `percent` of a minor unit amount, rounding half away from zero.
///
/// # Errors
///
/// Returns [`DiscountError::PercentConversion`] if the product overflows.
pub fn percent_of_minor(percent: &Percentage, minor: i64) -> Result<i64, DiscountError> {
    let minor = Decimal::from_i64(minor).ok_or(DiscountError::PercentConversion)?;

    ((*percent) * Decimal::ONE) // decimal_percentage doesn't expose the underlying Decimal
        .checked_mul(minor)
        .ok_or(DiscountError::PercentConversion)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(DiscountError::PercentConversion)
}

/// Build a rate from a fraction, rejecting anything outside `[0, 1)`.
///
/// # Errors
///
/// Returns [`DiscountError::RateOutOfRange`] for negative rates or rates of 100% and above.
pub fn rate(fraction: Decimal) -> Result<Percentage, DiscountError> {
    if fraction < Decimal::ZERO || fraction >= Decimal::ONE {
        return Err(DiscountError::RateOutOfRange(fraction));
    }

    Ok(Percentage::from(fraction))
}

/// The zero rate.
pub fn no_discount() -> Percentage {
    Percentage::from(Decimal::ZERO)
}

/// Converts a fractional percentage to percent points (`0.05` becomes `5.00`).
pub fn percent_points(percentage: Percentage) -> Decimal {
    ((percentage * Decimal::ONE) * Decimal::ONE_HUNDRED).round_dp(2)
}

/// Whole percent points for labels, rounded half away from zero (`0.9999` becomes `100`).
pub fn whole_percent_points(percentage: Percentage) -> Decimal {
    percent_points(percentage).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn percent_of_minor_calculates_correctly() -> TestResult {
        let percent = Percentage::from(0.25);

        assert_eq!(percent_of_minor(&percent, 200)?, 50);

        Ok(())
    }

    #[test]
    fn percent_of_minor_rounds_half_away_from_zero() -> TestResult {
        let percent = Percentage::from(Decimal::new(16, 2));

        // 195 * 0.16 = 31.2
        assert_eq!(percent_of_minor(&percent, 195)?, 31);
        // 25 * 0.5 = 12.5
        assert_eq!(percent_of_minor(&Percentage::from(0.5), 25)?, 13);

        Ok(())
    }

    #[test]
    fn percent_of_minor_overflow_returns_error() {
        let percent = Percentage::from(2.0);

        assert_eq!(
            percent_of_minor(&percent, i64::MAX),
            Err(DiscountError::PercentConversion)
        );
    }

    #[test]
    fn rate_accepts_half_open_range() -> TestResult {
        rate(Decimal::ZERO)?;
        rate(Decimal::new(9999, 4))?;

        assert_eq!(
            rate(Decimal::ONE),
            Err(DiscountError::RateOutOfRange(Decimal::ONE))
        );
        assert!(rate(Decimal::NEGATIVE_ONE).is_err());

        Ok(())
    }

    #[test]
    fn whole_percent_points_rounds_for_labels() {
        assert_eq!(
            whole_percent_points(Percentage::from(Decimal::new(5, 2))),
            Decimal::from(5)
        );
        assert_eq!(
            whole_percent_points(Percentage::from(Decimal::new(9999, 4))),
            Decimal::from(100)
        );
    }
}
