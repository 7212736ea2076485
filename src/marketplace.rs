//! Marketplace
//!
//! Browsing and filtering the catalog, the wishlist and adding lines to the
//! cart. The user's own scanned listing, when stored, is shown first.

use std::{fmt, str::FromStr, sync::Arc};

use rustc_hash::FxHashSet;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    cart::{CartError, session::CartSession},
    listings::{Listing, ListingError, ListingId, ListingRecord},
    storage::{self, StorageError, StorageKey, Store},
};

/// Marketplace errors
#[derive(Debug, Error)]
pub enum MarketplaceError {
    /// No listing has this id
    #[error("Listing {0} not found")]
    NotFound(ListingId),

    /// Stored own listing could not be read
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Stored own listing is malformed
    #[error(transparent)]
    Listing(#[from] ListingError),

    /// Cart rejected the line
    #[error(transparent)]
    Cart(#[from] CartError),
}

/// Location filter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LocationFilter {
    /// Every location
    #[default]
    All,

    /// Listings in this country only
    Country(String),
}

impl LocationFilter {
    fn matches(&self, listing: &Listing) -> bool {
        match self {
            LocationFilter::All => true,
            LocationFilter::Country(country) => &listing.location.country == country,
        }
    }
}

impl FromStr for LocationFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            Ok(LocationFilter::All)
        } else {
            Ok(LocationFilter::Country(s.to_string()))
        }
    }
}

impl fmt::Display for LocationFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationFilter::All => f.write_str("all"),
            LocationFilter::Country(country) => f.write_str(country),
        }
    }
}

/// Search term plus location filter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MarketplaceQuery {
    /// Free-text search, matched against title and category
    pub search: String,

    /// Location filter
    pub location: LocationFilter,
}

impl MarketplaceQuery {
    /// Query with a search term and no location filter.
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: term.into(),
            location: LocationFilter::All,
        }
    }

    /// Restrict to a country.
    #[must_use]
    pub fn in_country(mut self, country: impl Into<String>) -> Self {
        self.location = LocationFilter::Country(country.into());
        self
    }

    /// Parse a query string such as `search=glass&location=Kenya`. Unknown
    /// keys are ignored.
    pub fn parse(query: &str) -> Self {
        let mut parsed = Self::default();

        for pair in query.trim_start_matches('?').split('&') {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = decode_component(value);

            match key {
                "search" => parsed.search = value,
                "location" => {
                    parsed.location = match value.parse() {
                        Ok(location) => location,
                        Err(never) => match never {},
                    };
                }
                _ => {}
            }
        }

        parsed
    }

    /// Whether `listing` passes the location filter and, with a non-empty
    /// search, has the term in its title or category (ignoring case).
    pub fn matches(&self, listing: &Listing) -> bool {
        if !self.location.matches(listing) {
            return false;
        }

        let term = self.search.trim().to_lowercase();

        term.is_empty()
            || listing.title.to_lowercase().contains(&term)
            || listing.category.to_lowercase().contains(&term)
    }
}

impl fmt::Display for MarketplaceQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::with_capacity(2);

        if !self.search.is_empty() {
            parts.push(format!("search={}", encode_component(&self.search)));
        }

        if let LocationFilter::Country(country) = &self.location {
            parts.push(format!("location={}", encode_component(country)));
        }

        f.write_str(&parts.join("&"))
    }
}

fn decode_component(value: &str) -> String {
    value.replace("%20", " ").replace('+', " ")
}

fn encode_component(value: &str) -> String {
    value.replace(' ', "+")
}

/// Result of toggling a wishlist entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WishlistChange {
    /// Listing was added
    Added,

    /// Listing was removed
    Removed,
}

/// Catalog view for one session.
pub struct Marketplace {
    listings: Vec<Listing>,
    wishlist: FxHashSet<ListingId>,
}

impl fmt::Debug for Marketplace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Marketplace")
            .field("listings", &self.listings.len())
            .field("wishlist", &self.wishlist)
            .finish()
    }
}

impl Marketplace {
    /// Build the marketplace from `catalog`, placing any stored own listing first.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored own listing is malformed.
    pub fn new(catalog: Vec<Listing>, store: &Arc<dyn Store>) -> Result<Self, MarketplaceError> {
        let own = storage::read::<ListingRecord>(store.as_ref(), StorageKey::UserListing)?
            .map(Listing::try_from)
            .transpose()?;

        let listings = own.into_iter().chain(catalog).collect::<Vec<_>>();

        debug!(listings = listings.len(), "marketplace loaded");

        Ok(Self {
            listings,
            wishlist: FxHashSet::default(),
        })
    }

    /// Every listing, own listing first.
    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    /// Listings matching `query`, in catalog order.
    pub fn filter(&self, query: &MarketplaceQuery) -> Vec<&Listing> {
        self.listings
            .iter()
            .filter(|listing| query.matches(listing))
            .collect()
    }

    /// Distinct countries, in first-seen order.
    pub fn countries(&self) -> Vec<&str> {
        let mut seen = FxHashSet::default();

        self.listings
            .iter()
            .map(|listing| listing.location.country.as_str())
            .filter(|country| seen.insert(*country))
            .collect()
    }

    /// Listing by id.
    pub fn get(&self, id: &ListingId) -> Option<&Listing> {
        self.listings.iter().find(|listing| &listing.id == id)
    }

    /// Listing for the product page, with the default seller filled in.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError::NotFound`] for unknown ids.
    pub fn view(&self, id: &ListingId) -> Result<Listing, MarketplaceError> {
        self.get(id)
            .map(Listing::with_default_seller)
            .ok_or_else(|| MarketplaceError::NotFound(id.clone()))
    }

    /// Add or remove a listing from the wishlist.
    pub fn toggle_wishlist(&mut self, id: &ListingId) -> WishlistChange {
        if self.wishlist.remove(id) {
            debug!(%id, "removed from wishlist");

            WishlistChange::Removed
        } else {
            self.wishlist.insert(id.clone());

            debug!(%id, "added to wishlist");

            WishlistChange::Added
        }
    }

    /// Whether a listing is on the wishlist.
    pub fn is_wishlisted(&self, id: &ListingId) -> bool {
        self.wishlist.contains(id)
    }

    /// Append a listing to the cart. Adding the same listing twice adds two lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing is unknown or the cart cannot be saved.
    pub async fn add_to_cart(
        &self,
        id: &ListingId,
        cart: &CartSession,
    ) -> Result<Listing, MarketplaceError> {
        let listing = self
            .get(id)
            .cloned()
            .ok_or_else(|| MarketplaceError::NotFound(id.clone()))?;

        cart.add(listing.clone()).await?;

        info!(%id, "listing added to cart from marketplace");

        Ok(listing)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use decimal_percentage::Percentage;
    use rust_decimal::Decimal;
    use rusty_money::iso::KES;
    use testresult::TestResult;

    use crate::{
        fixtures::catalog,
        listings::glass_bottles,
        promotions::PromoTable,
        storage::MemoryStore,
    };

    use super::*;

    fn store() -> Arc<dyn Store> {
        Arc::new(MemoryStore::new())
    }

    fn ids(listings: &[&Listing]) -> Vec<String> {
        listings.iter().map(|listing| listing.id.to_string()).collect()
    }

    #[test]
    fn query_string_round_trip() {
        let query = MarketplaceQuery::parse("search=glass&location=Kenya");

        assert_eq!(query, MarketplaceQuery::search("glass").in_country("Kenya"));
        assert_eq!(query.to_string(), "search=glass&location=Kenya");
        assert_eq!(MarketplaceQuery::parse("?location=all"), MarketplaceQuery::default());
        assert_eq!(MarketplaceQuery::parse("search=glass+bottles").search, "glass bottles");
    }

    #[test]
    fn search_matches_title_or_category_ignoring_case() {
        let bottles = glass_bottles();

        assert!(MarketplaceQuery::search("GLASS").matches(&bottles));
        assert!(MarketplaceQuery::search("mixed").matches(&bottles));
        assert!(MarketplaceQuery::search("  ").matches(&bottles));
        assert!(!MarketplaceQuery::search("copper").matches(&bottles));
    }

    #[test]
    fn location_filter_is_exact_country() {
        let bottles = glass_bottles();

        assert!(MarketplaceQuery::default().in_country("Kenya").matches(&bottles));
        assert!(!MarketplaceQuery::default().in_country("kenya").matches(&bottles));
        assert!(!MarketplaceQuery::search("glass").in_country("Nigeria").matches(&bottles));
    }

    #[test]
    fn glass_in_kenya_finds_the_bottles() -> TestResult {
        let market = Marketplace::new(catalog()?, &store())?;

        let found = market.filter(&MarketplaceQuery::parse("search=glass&location=Kenya"));

        assert_eq!(ids(&found), ["6"]);
        assert_eq!(market.filter(&MarketplaceQuery::default()).len(), 13);
        assert!(market.countries().contains(&"Kenya"));

        Ok(())
    }

    #[test]
    fn own_listing_comes_first() -> TestResult {
        let store = store();
        let mut own = glass_bottles();

        own.id = ListingId::new("own-1");
        own.own_listing = true;

        storage::write(store.as_ref(), StorageKey::UserListing, &ListingRecord::from(&own))?;

        let market = Marketplace::new(catalog()?, &store)?;

        assert_eq!(market.listings().first(), Some(&own));
        assert_eq!(market.listings().len(), 14);

        Ok(())
    }

    #[test]
    fn view_fills_default_seller() -> TestResult {
        let market = Marketplace::new(catalog()?, &store())?;

        let named = market.view(&ListingId::new("2"))?;
        let unnamed = market.view(&ListingId::new("3"))?;

        assert_eq!(named.seller.map(|seller| seller.name).as_deref(), Some("Adeyemi Textiles Ltd"));
        assert_eq!(
            unnamed.seller.map(|seller| seller.name).as_deref(),
            Some("WasteLink Verified Seller")
        );
        assert!(matches!(
            market.view(&ListingId::new("404")),
            Err(MarketplaceError::NotFound(_))
        ));

        Ok(())
    }

    #[test]
    fn wishlist_toggles() -> TestResult {
        let mut market = Marketplace::new(catalog()?, &store())?;
        let id = ListingId::new("6");

        assert_eq!(market.toggle_wishlist(&id), WishlistChange::Added);
        assert!(market.is_wishlisted(&id));
        assert_eq!(market.toggle_wishlist(&id), WishlistChange::Removed);
        assert!(!market.is_wishlisted(&id));

        Ok(())
    }

    #[tokio::test]
    async fn add_to_cart_appends_duplicates() -> TestResult {
        let store = store();
        let market = Marketplace::new(catalog()?, &store)?;
        let cart = CartSession::load(
            Arc::clone(&store),
            KES,
            PromoTable::default(),
            Percentage::from(Decimal::new(16, 2)),
            Duration::from_secs(5),
        )?;

        market.add_to_cart(&ListingId::new("6"), &cart).await?;
        market.add_to_cart(&ListingId::new("6"), &cart).await?;

        assert_eq!(cart.snapshot().await.len(), 2);
        assert_eq!(crate::cart::session::stored_items(store.as_ref())?.len(), 2);

        Ok(())
    }
}
