//! Pricing
//!
//! Order totals for a list of cart lines:
//!
//! ```text
//! subtotal = Σ asking price
//! discount = subtotal × discount rate
//! tax      = (subtotal − discount) × tax rate
//! total    = subtotal − discount + tax
//! ```
//!
//! Amounts are kept in minor units; each percentage step rounds half away
//! from zero to a whole minor unit.

use decimal_percentage::Percentage;
use rusty_money::{Money, MoneyError, iso::Currency};
use thiserror::Error;

use crate::{
    discounts::{DiscountError, percent_of_minor},
    listings::Listing,
    prices::Price,
};

/// Errors that can occur while calculating totals.
#[derive(Debug, Error, PartialEq)]
pub enum PricingError {
    /// An item's currency differs from the cart currency (index, item currency, cart currency).
    #[error("Item {0} has currency {1}, but cart has currency {2}")]
    CurrencyMismatch(usize, &'static str, &'static str),

    /// Percentage arithmetic failed.
    #[error(transparent)]
    Discount(#[from] DiscountError),

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// Order totals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totals {
    subtotal: Price,
    discount: Price,
    tax: Price,
    total: Price,
    discount_rate: Percentage,
    tax_rate: Percentage,
}

impl Totals {
    /// Sum of asking prices.
    pub fn subtotal(&self) -> Price {
        self.subtotal
    }

    /// Amount taken off by the promo code.
    pub fn discount(&self) -> Price {
        self.discount
    }

    /// Tax on the discounted amount.
    pub fn tax(&self) -> Price {
        self.tax
    }

    /// Amount payable.
    pub fn total(&self) -> Price {
        self.total
    }

    /// Discount rate the totals were computed with.
    pub fn discount_rate(&self) -> Percentage {
        self.discount_rate
    }

    /// Tax rate the totals were computed with.
    pub fn tax_rate(&self) -> Percentage {
        self.tax_rate
    }

    /// Whether a non-zero discount applies.
    pub fn has_discount(&self) -> bool {
        self.discount.to_minor_units() != 0
    }
}

/// Ensure every item is priced in `currency`.
///
/// # Errors
///
/// Returns [`PricingError::CurrencyMismatch`] naming the first offending item.
pub fn ensure_currency(items: &[Listing], currency: &'static Currency) -> Result<(), PricingError> {
    items.iter().enumerate().try_for_each(|(i, item)| {
        let item_currency = item.asking_price.currency();

        if item_currency == currency {
            Ok(())
        } else {
            Err(PricingError::CurrencyMismatch(
                i,
                item_currency.iso_alpha_code,
                currency.iso_alpha_code,
            ))
        }
    })
}

/// Calculate totals for `items`.
///
/// An empty list totals to zero in `currency`.
///
/// # Errors
///
/// Returns an error if an item is priced in another currency or if the
/// percentage arithmetic overflows.
pub fn calculate_totals(
    items: &[Listing],
    discount_rate: Percentage,
    tax_rate: Percentage,
    currency: &'static Currency,
) -> Result<Totals, PricingError> {
    ensure_currency(items, currency)?;

    let subtotal = items
        .iter()
        .try_fold(Money::from_minor(0, currency), |acc, item| {
            acc.add(item.asking_price)
        })?;

    let discount = Money::from_minor(
        percent_of_minor(&discount_rate, subtotal.to_minor_units())?,
        currency,
    );

    let taxable = subtotal.sub(discount)?;

    let tax = Money::from_minor(
        percent_of_minor(&tax_rate, taxable.to_minor_units())?,
        currency,
    );

    let total = taxable.add(tax)?;

    Ok(Totals {
        subtotal,
        discount,
        tax,
        total,
        discount_rate,
        tax_rate,
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rusty_money::iso::{KES, USD};
    use testresult::TestResult;

    use crate::{discounts::no_discount, listings::glass_bottles};

    use super::*;

    fn vat() -> Percentage {
        Percentage::from(Decimal::new(16, 2))
    }

    fn priced(minor: i64) -> Listing {
        Listing {
            asking_price: Money::from_minor(minor, KES),
            ..glass_bottles()
        }
    }

    #[test]
    fn recycle5_on_glass_bottles() -> TestResult {
        let totals = calculate_totals(
            &[glass_bottles()],
            Percentage::from(Decimal::new(5, 2)),
            vat(),
            KES,
        )?;

        assert_eq!(totals.subtotal(), Money::from_minor(1_950_000, KES));
        assert_eq!(totals.discount(), Money::from_minor(97_500, KES));
        assert_eq!(totals.tax(), Money::from_minor(296_400, KES));
        assert_eq!(totals.total(), Money::from_minor(2_148_900, KES));
        assert!(totals.has_discount());

        Ok(())
    }

    #[test]
    fn no_discount_adds_vat_only() -> TestResult {
        let totals = calculate_totals(&[glass_bottles()], no_discount(), vat(), KES)?;

        assert_eq!(totals.discount(), Money::from_minor(0, KES));
        assert_eq!(totals.tax(), Money::from_minor(312_000, KES));
        assert_eq!(totals.total(), Money::from_minor(2_262_000, KES));
        assert!(!totals.has_discount());

        Ok(())
    }

    #[test]
    fn waste10_leaves_a_sliver() -> TestResult {
        let totals = calculate_totals(
            &[glass_bottles()],
            Percentage::from(Decimal::new(9999, 4)),
            vat(),
            KES,
        )?;

        // 1_950_000 × 0.9999 = 1_949_805, leaving 195 cents taxed to 31.2
        assert_eq!(totals.discount(), Money::from_minor(1_949_805, KES));
        assert_eq!(totals.tax(), Money::from_minor(31, KES));
        assert_eq!(totals.total(), Money::from_minor(226, KES));

        Ok(())
    }

    #[test]
    fn total_is_subtotal_times_one_minus_rate_times_vat() -> TestResult {
        // Subtotals chosen so every intermediate amount is a whole number of cents.
        for (subtotal, rate) in [(10_000, 0), (2_500, 20), (1_950_000, 5), (40_000, 75)] {
            let rate = Decimal::new(rate, 2);
            let totals = calculate_totals(&[priced(subtotal)], Percentage::from(rate), vat(), KES)?;

            let expected = Decimal::from(subtotal) * (Decimal::ONE - rate) * Decimal::new(116, 2);

            assert_eq!(
                Decimal::from(totals.total().to_minor_units()),
                expected,
                "subtotal {subtotal} at rate {rate}"
            );
        }

        Ok(())
    }

    #[test]
    fn subtotal_sums_duplicates() -> TestResult {
        let items = [priced(100), priced(200), priced(100)];

        let totals = calculate_totals(&items, no_discount(), vat(), KES)?;

        assert_eq!(totals.subtotal(), Money::from_minor(400, KES));

        Ok(())
    }

    #[test]
    fn empty_cart_totals_zero() -> TestResult {
        let totals = calculate_totals(&[], Percentage::from(Decimal::new(5, 2)), vat(), KES)?;

        assert_eq!(totals.total(), Money::from_minor(0, KES));
        assert_eq!(totals.total().currency(), KES);

        Ok(())
    }

    #[test]
    fn currency_mismatch_is_rejected() {
        let mut dollars = glass_bottles();
        dollars.asking_price = Money::from_minor(100, USD);

        let result = calculate_totals(&[glass_bottles(), dollars], no_discount(), vat(), KES);

        assert_eq!(
            result,
            Err(PricingError::CurrencyMismatch(1, "USD", "KES"))
        );
    }
}
