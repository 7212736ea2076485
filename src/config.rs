//! Settings
//!
//! Every field has a default matching the storefront, so an empty YAML
//! document (or no file at all) yields a working configuration.

use std::{fs, path::Path, time::Duration};

use decimal_percentage::Percentage;
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use rusty_money::iso::Currency;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    discounts::{self, DiscountError},
    prices::{self, PriceError},
    promotions::{PromoError, PromoTable},
};

/// Settings errors
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Settings file could not be read
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    /// Settings YAML is malformed
    #[error("Failed to parse settings: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Currency code is not supported
    #[error(transparent)]
    Currency(#[from] PriceError),

    /// Tax rate is out of range
    #[error("Invalid tax rate: {0}")]
    TaxRate(#[from] DiscountError),

    /// A promo code has an invalid rate
    #[error(transparent)]
    Promo(#[from] PromoError),
}

/// Timer durations, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
#[expect(clippy::struct_field_names, reason = "field names mirror the settings file keys")]
pub struct Timings {
    /// Window in which a removed cart item can be restored
    pub undo_window_ms: u64,

    /// "Thinking" delay before a chat reply starts typing
    pub response_delay_ms: u64,

    /// Delay between revealed characters
    pub typing_interval_ms: u64,

    /// Simulated STK push processing
    pub payment_processing_ms: u64,

    /// How long the payment success step stays up
    pub payment_success_ms: u64,

    /// Simulated scanner analysis
    pub scan_delay_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            undo_window_ms: 5_000,
            response_delay_ms: 1_500,
            typing_interval_ms: 10,
            payment_processing_ms: 5_000,
            payment_success_ms: 2_000,
            scan_delay_ms: 2_000,
        }
    }
}

impl Timings {
    /// Undo window for removed cart items.
    pub fn undo_window(&self) -> Duration {
        Duration::from_millis(self.undo_window_ms)
    }

    /// Chat "thinking" delay.
    pub fn response_delay(&self) -> Duration {
        Duration::from_millis(self.response_delay_ms)
    }

    /// Chat typing interval.
    pub fn typing_interval(&self) -> Duration {
        Duration::from_millis(self.typing_interval_ms)
    }

    /// STK push processing time.
    pub fn payment_processing(&self) -> Duration {
        Duration::from_millis(self.payment_processing_ms)
    }

    /// Payment success display time.
    pub fn payment_success(&self) -> Duration {
        Duration::from_millis(self.payment_success_ms)
    }

    /// Scanner analysis time.
    pub fn scan_delay(&self) -> Duration {
        Duration::from_millis(self.scan_delay_ms)
    }
}

/// Application settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// ISO code prices are quoted in
    pub currency: String,

    /// Flat tax applied after discounts (VAT)
    pub tax_rate: Decimal,

    /// Promo codes and their discount rates, as fractions
    pub promo_codes: FxHashMap<String, Decimal>,

    /// Sentence terminators after which the typing reveal stops
    pub sentence_limit: usize,

    /// Minimum M-Pesa phone number length
    pub min_phone_length: usize,

    /// Timer durations
    pub timings: Timings,
}

impl Default for Settings {
    fn default() -> Self {
        let mut promo_codes = FxHashMap::default();

        promo_codes.insert("WASTE10".to_string(), Decimal::new(9999, 4));
        promo_codes.insert("RECYCLE5".to_string(), Decimal::new(5, 2));

        Self {
            currency: "KES".to_string(),
            tax_rate: Decimal::new(16, 2),
            promo_codes,
            sentence_limit: 3,
            min_phone_length: 10,
            timings: Timings::default(),
        }
    }
}

impl Settings {
    /// Parse settings from YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, SettingsError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        Ok(serde_norway::from_str(yaml)?)
    }

    /// Load settings from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        Self::from_yaml_str(&fs::read_to_string(path)?)
    }

    /// Quote currency.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured code is unsupported.
    pub fn currency(&self) -> Result<&'static Currency, SettingsError> {
        Ok(prices::currency(&self.currency)?)
    }

    /// Tax rate.
    ///
    /// # Errors
    ///
    /// Returns an error if the rate is outside `[0, 1)`.
    pub fn tax(&self) -> Result<Percentage, SettingsError> {
        Ok(discounts::rate(self.tax_rate)?)
    }

    /// Promo table.
    ///
    /// # Errors
    ///
    /// Returns an error if any configured rate is outside `[0, 1)`.
    pub fn promo_table(&self) -> Result<PromoTable, SettingsError> {
        Ok(PromoTable::from_rates(
            self.promo_codes
                .iter()
                .map(|(code, rate)| (code.clone(), *rate)),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::KES;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn empty_document_gives_defaults() -> TestResult {
        let settings = Settings::from_yaml_str("")?;

        assert_eq!(settings, Settings::default());
        assert_eq!(settings.currency()?, KES);
        assert_eq!(settings.timings.undo_window(), Duration::from_secs(5));
        assert_eq!(settings.timings.response_delay(), Duration::from_millis(1_500));

        Ok(())
    }

    #[test]
    fn partial_document_keeps_other_defaults() -> TestResult {
        let settings = Settings::from_yaml_str(
            "promo_codes:\n  WASTE10: 0.1\ntimings:\n  typing_interval_ms: 25\n",
        )?;

        assert_eq!(settings.timings.typing_interval(), Duration::from_millis(25));
        assert_eq!(settings.timings.scan_delay(), Duration::from_secs(2));
        assert_eq!(settings.tax_rate, Decimal::new(16, 2));

        let table = settings.promo_table()?;

        assert_eq!(table.len(), 1);
        assert_eq!(
            table.lookup("WASTE10")?.rate(),
            Percentage::from(Decimal::new(1, 1))
        );

        Ok(())
    }

    #[test]
    fn unsupported_currency_is_an_error() -> TestResult {
        let settings = Settings::from_yaml_str("currency: XYZ\n")?;

        assert!(matches!(
            settings.currency(),
            Err(SettingsError::Currency(PriceError::UnknownCurrency(_)))
        ));

        Ok(())
    }

    #[test]
    fn tax_rate_must_be_a_fraction() -> TestResult {
        let settings = Settings::from_yaml_str("tax_rate: 16\n")?;

        assert!(matches!(settings.tax(), Err(SettingsError::TaxRate(_))));

        Ok(())
    }
}
