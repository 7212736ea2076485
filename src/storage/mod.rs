//! Storage
//!
//! A small key-value store standing in for browser local storage. Values are
//! JSON documents wrapped in a versioned envelope; a missing key reads as
//! absent. There is no locking across processes: last write wins.

use std::fmt;

use mockall::automock;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Envelope version written by this crate.
pub const SCHEMA_VERSION: u32 = 1;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// IO error from a file-backed store
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored value could not be (de)serialized
    #[error("stored value is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Stored envelope was written by an incompatible version
    #[error("{key} was stored with schema version {found}, expected {expected}")]
    UnsupportedVersion {
        /// Storage key
        key: &'static str,

        /// Version found in the envelope
        found: u32,

        /// Version this build understands
        expected: u32,
    },

    /// A store lock was poisoned by a panicking writer
    #[error("store lock poisoned")]
    Poisoned,
}

/// Keys used by the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    /// Cart contents
    Cart,

    /// Signed-in user
    User,

    /// Listing the user created with the scanner
    UserListing,
}

impl StorageKey {
    /// Raw key name.
    pub fn as_str(self) -> &'static str {
        match self {
            StorageKey::Cart => "cartItem",
            StorageKey::User => "user",
            StorageKey::UserListing => "userListing",
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw string store.
#[automock]
pub trait Store: Send + Sync {
    /// Read a raw value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a raw value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be written.
    fn put(&self, key: &str, value: String) -> Result<(), StorageError>;

    /// Remove a value. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    version: u32,
    data: &'a T,
}

#[derive(Deserialize)]
struct RawEnvelope {
    version: u32,
    data: serde_json::Value,
}

/// Read and decode a typed value.
///
/// # Errors
///
/// Returns an error if the stored value is malformed or has an unsupported version.
pub fn read<T: DeserializeOwned>(
    store: &dyn Store,
    key: StorageKey,
) -> Result<Option<T>, StorageError> {
    let Some(raw) = store.get(key.as_str())? else {
        return Ok(None);
    };

    let envelope: RawEnvelope = serde_json::from_str(&raw)?;

    if envelope.version != SCHEMA_VERSION {
        return Err(StorageError::UnsupportedVersion {
            key: key.as_str(),
            found: envelope.version,
            expected: SCHEMA_VERSION,
        });
    }

    Ok(Some(serde_json::from_value(envelope.data)?))
}

/// Encode and write a typed value.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized or written.
pub fn write<T: Serialize>(store: &dyn Store, key: StorageKey, value: &T) -> Result<(), StorageError> {
    let encoded = serde_json::to_string(&EnvelopeRef {
        version: SCHEMA_VERSION,
        data: value,
    })?;

    store.put(key.as_str(), encoded)
}

/// Remove a typed value.
///
/// # Errors
///
/// Returns an error if the backing medium cannot be written.
pub fn clear(store: &dyn Store, key: StorageKey) -> Result<(), StorageError> {
    store.remove(key.as_str())
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn missing_key_reads_as_none() -> TestResult {
        let store = MemoryStore::new();

        let value: Option<Vec<String>> = read(&store, StorageKey::Cart)?;

        assert!(value.is_none());

        Ok(())
    }

    #[test]
    fn values_are_wrapped_in_versioned_envelope() -> TestResult {
        let store = MemoryStore::new();

        write(&store, StorageKey::User, &"Wanjiru")?;

        let raw = store.get("user")?.ok_or("Expected raw value")?;

        assert_eq!(raw, r#"{"version":1,"data":"Wanjiru"}"#);
        assert_eq!(
            read::<String>(&store, StorageKey::User)?.as_deref(),
            Some("Wanjiru")
        );

        Ok(())
    }

    #[test]
    fn unknown_version_is_rejected() -> TestResult {
        let store = MemoryStore::new();

        store.put("cartItem", r#"{"version":7,"data":[]}"#.to_string())?;

        let result = read::<Vec<String>>(&store, StorageKey::Cart);

        assert!(
            matches!(
                result,
                Err(StorageError::UnsupportedVersion {
                    key: "cartItem",
                    found: 7,
                    expected: 1
                })
            ),
            "expected version error, got {result:?}"
        );

        Ok(())
    }

    #[test]
    fn unversioned_blob_is_a_json_error() -> TestResult {
        let store = MemoryStore::new();

        store.put("cartItem", "true".to_string())?;

        assert!(matches!(
            read::<Vec<String>>(&store, StorageKey::Cart),
            Err(StorageError::Json(_))
        ));

        Ok(())
    }

    #[test]
    fn clear_removes_value() -> TestResult {
        let store = MemoryStore::new();

        write(&store, StorageKey::UserListing, &1_u32)?;
        clear(&store, StorageKey::UserListing)?;

        assert!(read::<u32>(&store, StorageKey::UserListing)?.is_none());

        Ok(())
    }
}
