use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use super::{LocalStore, StorageError, validate_key};

/// In-memory [`LocalStore`]. State lives as long as the value.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `entries`.
    #[must_use]
    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let values = entries
            .into_iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Self {
            values: Mutex::new(values),
        }
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        validate_key(key)?;
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("token").unwrap(), None);

        store.set("token", "abc").unwrap();
        assert_eq!(store.get("token").unwrap().as_deref(), Some("abc"));

        store.remove("token").unwrap();
        store.remove("token").unwrap();
        assert_eq!(store.get("token").unwrap(), None);
    }

    #[test]
    fn test_with_entries() {
        let store = MemoryStore::with_entries([("cart", "[]")]);
        assert_eq!(store.get("cart").unwrap().as_deref(), Some("[]"));
    }
}
