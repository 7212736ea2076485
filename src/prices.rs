//! Prices

use rust_decimal::{Decimal, prelude::ToPrimitive};
use rusty_money::{
    Money,
    iso::{self, Currency},
};
use thiserror::Error;

/// A monetary amount in one of the statically known ISO currencies.
pub type Price = Money<'static, Currency>;

/// Errors raised while parsing or building prices.
#[derive(Debug, Error, PartialEq)]
pub enum PriceError {
    /// Price string was not in the `AMOUNT CURRENCY` form.
    #[error("Invalid price format: {0}")]
    InvalidPrice(String),

    /// Currency code is not one we trade in.
    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),
}

/// Resolve an ISO alpha code to a currency.
///
/// # Errors
///
/// Returns [`PriceError::UnknownCurrency`] for codes outside the supported set.
pub fn currency(code: &str) -> Result<&'static Currency, PriceError> {
    match code {
        "KES" => Ok(iso::KES),
        "USD" => Ok(iso::USD),
        "EUR" => Ok(iso::EUR),
        "GBP" => Ok(iso::GBP),
        other => Err(PriceError::UnknownCurrency(other.to_string())),
    }
}

/// Build a price from a major-unit amount (e.g. `19500` shillings).
///
/// # Errors
///
/// Returns [`PriceError::InvalidPrice`] if the amount does not fit in minor units.
pub fn from_major(amount: Decimal, currency: &'static Currency) -> Result<Price, PriceError> {
    let scale = Decimal::from(10_u64.pow(currency.exponent));

    let minor_units = amount
        .checked_mul(scale)
        .and_then(|value| value.round_dp(0).to_i64())
        .ok_or_else(|| PriceError::InvalidPrice(amount.to_string()))?;

    Ok(Money::from_minor(minor_units, currency))
}

/// Parse a price string (e.g. `"19500 KES"` or `"2.99 GBP"`).
///
/// # Errors
///
/// Returns an error if the string is not in the format `AMOUNT CURRENCY`,
/// if the amount is not a decimal number, or if the currency code is unknown.
pub fn parse_price(s: &str) -> Result<Price, PriceError> {
    let mut parts = s.split_whitespace();

    let (Some(amount), Some(code), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(PriceError::InvalidPrice(format!(
            "Expected format 'AMOUNT CURRENCY', got: {s}"
        )));
    };

    let amount = amount
        .parse::<Decimal>()
        .map_err(|_err| PriceError::InvalidPrice(s.to_string()))?;

    from_major(amount, currency(code)?)
}

/// Major-unit amount of a price, keeping every minor digit (`19500.00`).
pub fn major_amount(price: &Price) -> Decimal {
    Decimal::new(price.to_minor_units(), price.currency().exponent)
}

/// Format a price in the same `AMOUNT CURRENCY` form [`parse_price`] reads.
pub fn format_price(price: &Price) -> String {
    format!(
        "{} {}",
        major_amount(price),
        price.currency().iso_alpha_code
    )
}
