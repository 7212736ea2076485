//! Listings
//!
//! A listing is a lot of waste offered on the marketplace. The same type is used
//! for cart lines: adding a listing to the cart copies it into the cart list.

use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::prices::{Price, PriceError, format_price, parse_price};

pub mod records;

pub use records::ListingRecord;

/// Errors raised while building listings.
#[derive(Debug, Error, PartialEq)]
pub enum ListingError {
    /// Asking price could not be parsed.
    #[error(transparent)]
    Price(#[from] PriceError),

    /// Grade letter was not A, B or C.
    #[error("Unknown grade: {0}")]
    UnknownGrade(String),

    /// Quantity unit was not recognised.
    #[error("Unknown unit: {0}")]
    UnknownUnit(String),
}

/// Listing identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(String);

impl ListingId {
    /// Wrap an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ListingId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Single-letter quality classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    /// Clean, sorted material.
    A,
    /// Some contamination.
    B,
    /// Mixed or heavily contaminated.
    C,
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
        })
    }
}

impl FromStr for Grade {
    type Err = ListingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(Grade::A),
            "B" | "b" => Ok(Grade::B),
            "C" | "c" => Ok(Grade::C),
            other => Err(ListingError::UnknownGrade(other.to_string())),
        }
    }
}

/// Unit a quantity is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    /// Kilograms
    #[default]
    Kg,
    /// Metric tonnes
    Tonnes,
    /// Individual pieces
    Pieces,
    /// Cubic metres
    CubicMeters,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Unit::Kg => "kg",
            Unit::Tonnes => "tonnes",
            Unit::Pieces => "pieces",
            Unit::CubicMeters => "m³",
        })
    }
}

impl FromStr for Unit {
    type Err = ListingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "kg" => Ok(Unit::Kg),
            "tonnes" => Ok(Unit::Tonnes),
            "pieces" => Ok(Unit::Pieces),
            "cubic_meters" | "m³" | "m3" => Ok(Unit::CubicMeters),
            other => Err(ListingError::UnknownUnit(other.to_string())),
        }
    }
}

/// Amount of material in a listing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    /// Amount
    pub amount: Decimal,

    /// Unit the amount is measured in
    pub unit: Unit,
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount.normalize(), self.unit)
    }
}

/// Quality details.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quality {
    /// Grade
    pub grade: Grade,

    /// Contamination percentage, when assessed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contamination: Option<u8>,
}

/// Where the material can be collected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// City
    pub city: String,

    /// Country
    pub country: String,
}

impl Location {
    /// Create a location.
    pub fn new(city: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            country: country.into(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.city, self.country)
    }
}

/// Seller shown on the product view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seller {
    /// Display name
    pub name: String,

    /// Average rating out of 5
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Decimal>,

    /// Completed sales
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_sales: Option<u32>,

    /// Identity checked by the platform
    #[serde(default)]
    pub verified: bool,

    /// Typical response time, e.g. "3 hours"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<String>,
}

impl Seller {
    /// Seller shown for listings that do not name one.
    pub fn verified_default() -> Self {
        Self {
            name: "WasteLink Verified Seller".to_string(),
            rating: Some(Decimal::new(42, 1)),
            total_sales: Some(89),
            verified: true,
            response_time: Some("3 hours".to_string()),
        }
    }
}

/// Market demand bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Demand {
    /// Low demand
    Low,
    /// Medium demand
    Medium,
    /// High demand
    High,
}

impl fmt::Display for Demand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Demand::Low => "Low",
            Demand::Medium => "Medium",
            Demand::High => "High",
        })
    }
}

/// Estimated value range, in major units of the listing currency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    /// Lower bound
    pub min: Decimal,

    /// Upper bound
    pub max: Decimal,
}

/// Analysis attached to scanned or curated listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketAnalysis {
    /// Classifier confidence in `[0, 1]`
    pub confidence: Decimal,

    /// Estimated value
    pub estimated_value: ValueRange,

    /// Market demand
    pub market_demand: Demand,
}

/// A marketplace listing, also used as a cart line.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    /// Identifier
    pub id: ListingId,

    /// Title
    pub title: String,

    /// Material category, e.g. "glass"
    pub category: String,

    /// Quantity on offer
    pub quantity: Quantity,

    /// Quality grade
    pub quality: Quality,

    /// Collection location
    pub location: Location,

    /// Asking price for the whole lot
    pub asking_price: Price,

    /// Seller accepts offers
    pub negotiable: bool,

    /// Image references
    pub images: Vec<String>,

    /// Seller, when known
    pub seller: Option<Seller>,

    /// Market analysis, when available
    pub analysis: Option<MarketAnalysis>,

    /// Created by the current user through the scanner
    pub own_listing: bool,
}

impl Listing {
    /// Seller to display, falling back to the verified default seller.
    pub fn seller_or_default(&self) -> Seller {
        self.seller.clone().unwrap_or_else(Seller::verified_default)
    }

    /// Copy of this listing with the default seller filled in when missing.
    #[must_use]
    pub fn with_default_seller(&self) -> Self {
        Self {
            seller: Some(self.seller_or_default()),
            ..self.clone()
        }
    }

    /// Asking price in `AMOUNT CURRENCY` form.
    pub fn price_label(&self) -> String {
        format_price(&self.asking_price)
    }
}

impl TryFrom<ListingRecord> for Listing {
    type Error = ListingError;

    fn try_from(record: ListingRecord) -> Result<Self, Self::Error> {
        Ok(Listing {
            asking_price: parse_price(&record.price)?,
            id: record.id,
            title: record.title,
            category: record.category,
            quantity: record.quantity,
            quality: record.quality,
            location: record.location,
            negotiable: record.negotiable,
            images: record.images,
            seller: record.seller,
            analysis: record.analysis,
            own_listing: record.own_listing,
        })
    }
}


#[cfg(test)]
pub(crate) use tests::glass_bottles;
