//! Listing records
//!
//! Serialized form of a [`Listing`], used by fixtures and the store. Prices are
//! written as `AMOUNT CURRENCY` strings so records stay readable.

use serde::{Deserialize, Serialize};

use crate::{
    listings::{Listing, ListingId, Location, MarketAnalysis, Quality, Quantity, Seller},
    prices::format_price,
};

/// Serialized listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    /// Identifier
    pub id: ListingId,

    /// Title
    pub title: String,

    /// Material category
    pub category: String,

    /// Quantity
    pub quantity: Quantity,

    /// Quality
    pub quality: Quality,

    /// Location
    pub location: Location,

    /// Asking price, e.g. `"19500 KES"`
    pub price: String,

    /// Seller accepts offers
    #[serde(default)]
    pub negotiable: bool,

    /// Image references
    #[serde(default)]
    pub images: Vec<String>,

    /// Seller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller: Option<Seller>,

    /// Market analysis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<MarketAnalysis>,

    /// Created by the current user
    #[serde(default)]
    pub own_listing: bool,
}

impl From<&Listing> for ListingRecord {
    fn from(listing: &Listing) -> Self {
        Self {
            id: listing.id.clone(),
            title: listing.title.clone(),
            category: listing.category.clone(),
            quantity: listing.quantity,
            quality: listing.quality,
            location: listing.location.clone(),
            price: format_price(&listing.asking_price),
            negotiable: listing.negotiable,
            images: listing.images.clone(),
            seller: listing.seller.clone(),
            analysis: listing.analysis.clone(),
            own_listing: listing.own_listing,
        }
    }
}
