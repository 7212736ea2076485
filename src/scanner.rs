//! Waste scanner
//!
//! A stand-in for image analysis: after a fixed delay every valid request gets
//! the same [`ScanResult`]. A result can be turned into the user's own listing,
//! which the marketplace shows first.

use std::{
    str::FromStr,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use rust_decimal::Decimal;
use rusty_money::iso;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, instrument, warn};

use crate::{
    auth::Access,
    listings::{
        Demand, Grade, Listing, ListingId, ListingRecord, Location, MarketAnalysis, Quality,
        Quantity, Unit, ValueRange,
    },
    prices::{PriceError, from_major},
    storage::{self, StorageError, StorageKey, Store},
};

/// Scanner errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// Guests cannot scan
    #[error("Scanner is not available in guest mode")]
    GuestAccess,

    /// No image was uploaded
    #[error("Please upload an image")]
    MissingImage,

    /// Quantity field was left empty
    #[error("Please enter the waste quantity")]
    MissingQuantity,

    /// Quantity is not a non-negative number
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Estimated value does not fit a price
    #[error(transparent)]
    Price(#[from] PriceError),

    /// Listing could not be stored
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// What the user submitted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanRequest {
    /// Uploaded image reference
    pub image: Option<String>,

    /// Quantity as typed
    pub quantity: String,

    /// Unit
    pub unit: Unit,

    /// Optional free-text description
    pub description: Option<String>,
}

/// Analysis outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanResult {
    /// Classifier confidence in `[0, 1]`
    pub confidence: Decimal,

    /// Material category
    pub category: String,

    /// Materials detected
    pub materials: Vec<String>,

    /// Quality grade
    pub grade: Grade,

    /// Estimated value in KES
    pub estimated_value: ValueRange,

    /// Selling tips
    pub recommendations: Vec<String>,

    /// Market trend note
    pub market_trends: String,

    /// Buyers interested in this material
    pub potential_buyers: u32,
}

impl ScanResult {
    /// The result every analysis returns.
    pub fn fixed() -> Self {
        Self {
            confidence: Decimal::new(92, 2),
            category: "plastic".to_string(),
            materials: vec!["HDPE".to_string(), "Polypropylene".to_string()],
            grade: Grade::A,
            estimated_value: ValueRange {
                min: Decimal::from(800),
                max: Decimal::from(1_200),
            },
            recommendations: vec![
                "Clean thoroughly before sale".to_string(),
                "Sort by color for 15% price premium".to_string(),
                "High demand in construction sector".to_string(),
            ],
            market_trends: "HDPE prices up 12% this month".to_string(),
            potential_buyers: 8,
        }
    }

    /// Confidence as whole percent.
    pub fn confidence_percent(&self) -> Decimal {
        (self.confidence * Decimal::ONE_HUNDRED).round()
    }

    /// Title used when the user gave no description.
    pub fn default_title(&self) -> String {
        format!("{} - Grade {}", self.materials.join(", "), self.grade)
    }
}

/// Parse the quantity field.
///
/// # Errors
///
/// Returns [`ScanError::MissingQuantity`] for an empty field and
/// [`ScanError::InvalidQuantity`] for anything but a non-negative number.
pub fn parse_quantity(raw: &str, unit: Unit) -> Result<Quantity, ScanError> {
    let raw = raw.trim();

    if raw.is_empty() {
        return Err(ScanError::MissingQuantity);
    }

    let amount = Decimal::from_str(raw).map_err(|_err| ScanError::InvalidQuantity(raw.to_string()))?;

    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(ScanError::InvalidQuantity(raw.to_string()));
    }

    Ok(Quantity { amount, unit })
}

/// Simulated analyser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scanner {
    delay: Duration,
}

impl Scanner {
    /// Analyser that answers after `delay`.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Check access and inputs without analysing.
    ///
    /// # Errors
    ///
    /// Returns the first problem found: guest access, missing image, then quantity.
    pub fn validate(&self, access: &Access, request: &ScanRequest) -> Result<Quantity, ScanError> {
        if !access.can_use_scanner() {
            return Err(ScanError::GuestAccess);
        }

        if request.image.as_deref().is_none_or(|image| image.trim().is_empty()) {
            return Err(ScanError::MissingImage);
        }

        parse_quantity(&request.quantity, request.unit)
    }

    /// Analyse the upload.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any waiting happens.
    #[instrument(skip(self, access))]
    pub async fn analyze(&self, access: &Access, request: &ScanRequest) -> Result<ScanResult, ScanError> {
        let quantity = match self.validate(access, request) {
            Ok(quantity) => quantity,
            Err(error) => {
                warn!(%error, "scan rejected");

                return Err(error);
            }
        };

        sleep(self.delay).await;

        let result = ScanResult::fixed();

        info!(%quantity, category = %result.category, grade = %result.grade, "scan complete");

        Ok(result)
    }

    /// Turn a result into the user's listing and store it.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is invalid or the store fails.
    pub fn publish_listing(
        &self,
        access: &Access,
        request: &ScanRequest,
        result: &ScanResult,
        store: &Arc<dyn Store>,
    ) -> Result<Listing, ScanError> {
        self.validate(access, request)?;

        let listing = to_listing(request, result, next_listing_id())?;

        storage::write(store.as_ref(), StorageKey::UserListing, &ListingRecord::from(&listing))?;

        info!(id = %listing.id, title = %listing.title, "listing created");

        Ok(listing)
    }
}

fn next_listing_id() -> ListingId {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis());

    ListingId::new(format!("user-{millis}"))
}

/// Build the listing a scan result produces.
///
/// # Errors
///
/// Returns an error if the quantity is invalid or the price does not fit.
pub fn to_listing(request: &ScanRequest, result: &ScanResult, id: ListingId) -> Result<Listing, ScanError> {
    let title = request
        .description
        .as_deref()
        .map(str::trim)
        .filter(|description| !description.is_empty())
        .map_or_else(|| result.default_title(), str::to_string);

    Ok(Listing {
        id,
        title,
        category: result.category.clone(),
        quantity: parse_quantity(&request.quantity, request.unit)?,
        quality: Quality {
            grade: result.grade,
            contamination: Some(5),
        },
        location: Location::new("Syokimau", "Kenya"),
        asking_price: from_major(result.estimated_value.max, iso::KES)?,
        negotiable: true,
        images: request.image.iter().cloned().collect(),
        seller: None,
        analysis: Some(MarketAnalysis {
            confidence: result.confidence,
            estimated_value: result.estimated_value,
            market_demand: Demand::High,
        }),
        own_listing: true,
    })
}

#[cfg(test)]
mod tests {
    use rusty_money::Money;
    use testresult::TestResult;
    use tokio::time::Instant;

    use crate::{auth::User, storage::MemoryStore};

    use super::*;

    fn member() -> Access {
        Access::Member(User::new("Grace Wanjiku"))
    }

    fn request(quantity: &str) -> ScanRequest {
        ScanRequest {
            image: Some("bottles.jpg".to_string()),
            quantity: quantity.to_string(),
            unit: Unit::Kg,
            description: None,
        }
    }

    #[test]
    fn guests_are_denied_first() {
        let scanner = Scanner::new(Duration::from_secs(2));

        assert!(matches!(
            scanner.validate(&Access::Guest, &ScanRequest::default()),
            Err(ScanError::GuestAccess)
        ));
    }

    #[test]
    fn image_and_quantity_are_required() {
        let scanner = Scanner::new(Duration::from_secs(2));

        let no_image = ScanRequest {
            image: None,
            ..request("10")
        };

        assert!(matches!(scanner.validate(&member(), &no_image), Err(ScanError::MissingImage)));
        assert!(matches!(scanner.validate(&member(), &request("  ")), Err(ScanError::MissingQuantity)));
        assert!(matches!(scanner.validate(&member(), &request("ten")), Err(ScanError::InvalidQuantity(_))));
        assert!(matches!(scanner.validate(&member(), &request("-1")), Err(ScanError::InvalidQuantity(_))));
    }

    #[test]
    fn fractional_quantity_is_kept() -> TestResult {
        let quantity = parse_quantity("12.5", Unit::Tonnes)?;

        assert_eq!(quantity.amount, Decimal::new(125, 1));
        assert_eq!(quantity.to_string(), "12.5 tonnes");

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn analysis_returns_fixed_result_after_delay() -> TestResult {
        let scanner = Scanner::new(Duration::from_secs(2));
        let started = Instant::now();

        let result = scanner.analyze(&member(), &request("150")).await?;

        assert!(started.elapsed() >= Duration::from_secs(2));
        assert_eq!(result, ScanResult::fixed());
        assert_eq!(result.confidence_percent(), Decimal::from(92));
        assert_eq!(result.potential_buyers, 8);

        Ok(())
    }

    #[test]
    fn listing_uses_default_title_and_max_price() -> TestResult {
        let listing = to_listing(&request("150"), &ScanResult::fixed(), ListingId::new("user-1"))?;

        assert_eq!(listing.title, "HDPE, Polypropylene - Grade A");
        assert_eq!(listing.asking_price, Money::from_minor(120_000, iso::KES));
        assert_eq!(listing.quality.contamination, Some(5));
        assert_eq!(listing.location.to_string(), "Syokimau, Kenya");
        assert_eq!(
            listing.analysis.map(|analysis| analysis.market_demand),
            Some(Demand::High)
        );
        assert!(listing.own_listing);

        Ok(())
    }

    #[test]
    fn description_becomes_title() -> TestResult {
        let described = ScanRequest {
            description: Some("Plastic crates, clean".to_string()),
            ..request("40")
        };

        let listing = to_listing(&described, &ScanResult::fixed(), ListingId::new("user-2"))?;

        assert_eq!(listing.title, "Plastic crates, clean");

        Ok(())
    }

    #[test]
    fn publish_stores_user_listing() -> TestResult {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let scanner = Scanner::new(Duration::ZERO);

        let listing = scanner.publish_listing(&member(), &request("150"), &ScanResult::fixed(), &store)?;

        let stored = storage::read::<ListingRecord>(store.as_ref(), StorageKey::UserListing)?
            .ok_or("expected stored listing")?;

        assert_eq!(Listing::try_from(stored)?, listing);
        assert!(listing.id.as_str().starts_with("user-"));

        Ok(())
    }
}
