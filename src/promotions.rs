//! Promo codes
//!
//! Codes are matched exactly against a table of rates. Only one code can be
//! active on a cart at a time; see [`crate::cart::Cart::apply_promo`].

use decimal_percentage::Percentage;
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::discounts::{self, DiscountError};

/// Promo code errors.
#[derive(Debug, Error, PartialEq)]
pub enum PromoError {
    /// Code is not in the table.
    #[error("Invalid promo code")]
    InvalidPromoCode(String),

    /// A code is already active; remove it first.
    #[error("Promo code {0} is already applied")]
    PromoAlreadyApplied(String),

    /// A table entry has an unusable rate.
    #[error("Promo code {code} has an invalid rate: {source}")]
    InvalidRate {
        /// Code with the bad rate
        code: String,

        /// Underlying error
        source: DiscountError,
    },
}

/// A promo code that matched the table.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedPromo {
    code: String,
    rate: Percentage,
}

impl AppliedPromo {
    /// The code as entered.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Discount rate.
    pub fn rate(&self) -> Percentage {
        self.rate
    }
}

/// Table of promo codes and their discount rates.
#[derive(Debug, Clone)]
pub struct PromoTable {
    codes: FxHashMap<String, Percentage>,
}

impl Default for PromoTable {
    /// `WASTE10` maps to 99.99% rather than 10%. It is kept as found in the
    /// storefront and can be overridden through [`crate::config::Settings`].
    fn default() -> Self {
        let mut codes = FxHashMap::default();

        codes.insert("WASTE10".to_string(), Percentage::from(Decimal::new(9999, 4)));
        codes.insert("RECYCLE5".to_string(), Percentage::from(Decimal::new(5, 2)));

        Self { codes }
    }
}

impl PromoTable {
    /// Create an empty table.
    pub fn empty() -> Self {
        Self {
            codes: FxHashMap::default(),
        }
    }

    /// Build a table from code/rate pairs.
    ///
    /// # Errors
    ///
    /// Returns [`PromoError::InvalidRate`] if a rate is outside `[0, 1)`.
    pub fn from_rates<I, S>(rates: I) -> Result<Self, PromoError>
    where
        I: IntoIterator<Item = (S, Decimal)>,
        S: Into<String>,
    {
        let codes = rates
            .into_iter()
            .map(|(code, fraction)| {
                let code = code.into();

                match discounts::rate(fraction) {
                    Ok(rate) => Ok((code, rate)),
                    Err(source) => Err(PromoError::InvalidRate { code, source }),
                }
            })
            .collect::<Result<FxHashMap<_, _>, _>>()?;

        Ok(Self { codes })
    }

    /// Look up a code. Matching is exact: no trimming, no case folding.
    ///
    /// # Errors
    ///
    /// Returns [`PromoError::InvalidPromoCode`] if the code is unknown.
    pub fn lookup(&self, code: &str) -> Result<AppliedPromo, PromoError> {
        self.codes
            .get(code)
            .map(|rate| AppliedPromo {
                code: code.to_string(),
                rate: *rate,
            })
            .ok_or_else(|| PromoError::InvalidPromoCode(code.to_string()))
    }

    /// Number of codes.
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Whether the table has no codes.
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}
