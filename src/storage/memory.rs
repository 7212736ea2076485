//! In-memory store.

use std::sync::Mutex;

use rustc_hash::FxHashMap;

use super::{StorageError, Store};

/// Process-local store, used by tests and short-lived sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<FxHashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Poisoned`] if a writer panicked while holding the lock.
    pub fn len(&self) -> Result<usize, StorageError> {
        Ok(self
            .entries
            .lock()
            .map_err(|_err| StorageError::Poisoned)?
            .len())
    }

    /// Whether the store is empty.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Poisoned`] if a writer panicked while holding the lock.
    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().map_err(|_err| StorageError::Poisoned)?;

        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: String) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_err| StorageError::Poisoned)?;

        entries.insert(key.to_string(), value);

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_err| StorageError::Poisoned)?;

        entries.remove(key);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn last_write_wins() -> TestResult {
        let store = MemoryStore::new();

        store.put("user", "first".to_string())?;
        store.put("user", "second".to_string())?;

        assert_eq!(store.get("user")?.as_deref(), Some("second"));
        assert_eq!(store.len()?, 1);

        Ok(())
    }

    #[test]
    fn removing_missing_key_is_ok() -> TestResult {
        let store = MemoryStore::new();

        store.remove("nothing")?;

        assert!(store.is_empty()?);

        Ok(())
    }
}
