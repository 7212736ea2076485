//! Fixtures
//!
//! The marketplace catalog ships as YAML. The bundled catalog is compiled in;
//! other catalogs can be loaded from disk with the same schema.

use std::{fs, path::Path};

use serde::Deserialize;
use thiserror::Error;

use crate::listings::{Listing, ListingError, ListingRecord};

const BUNDLED_CATALOG: &str = include_str!("../../fixtures/listings.yml");

/// Fixture Parsing Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error reading fixture files
    #[error("Failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// A listing in the fixture was invalid
    #[error("Invalid listing {id}: {source}")]
    Listing {
        /// Listing identifier as written in the fixture
        id: String,

        /// Underlying error
        source: ListingError,
    },
}

/// Wrapper for listings in YAML
#[derive(Debug, Deserialize)]
struct ListingsFixture {
    listings: Vec<ListingRecord>,
}

/// The catalog bundled with the crate.
///
/// # Errors
///
/// Returns an error if the bundled YAML is malformed.
pub fn catalog() -> Result<Vec<Listing>, FixtureError> {
    parse_catalog(BUNDLED_CATALOG)
}

/// Load a catalog from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_catalog(path: impl AsRef<Path>) -> Result<Vec<Listing>, FixtureError> {
    parse_catalog(&fs::read_to_string(path)?)
}

/// Parse a catalog from YAML text.
///
/// # Errors
///
/// Returns an error if the YAML is malformed or a listing price is invalid.
pub fn parse_catalog(yaml: &str) -> Result<Vec<Listing>, FixtureError> {
    let fixture: ListingsFixture = serde_norway::from_str(yaml)?;

    fixture
        .listings
        .into_iter()
        .map(|record| {
            let id = record.id.to_string();

            Listing::try_from(record).map_err(|source| FixtureError::Listing { id, source })
        })
        .collect()
}
