//! secrets::memory_store
//!
//! In-process secret storage.
//!
//! Nothing survives the process. Useful for tests and for running the
//! bootstrap against a throwaway session (`provider = "memory"`).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::traits::{SecretError, SecretStore};

/// Secret store backed by a `HashMap`.
///
/// Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemorySecretStore {
    data: Arc<Mutex<HashMap<String, String>>>,
}

impl MemorySecretStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with the given entries.
    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let data = entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            data: Arc::new(Mutex::new(data)),
        }
    }

    /// Keys currently present, sorted.
    pub fn keys(&self) -> Vec<String> {
        let data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<String> = data.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl SecretStore for MemorySecretStore {
    fn get(&self, key: &str) -> Result<Option<String>, SecretError> {
        let data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(data.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SecretError> {
        let mut data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), SecretError> {
        let mut data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        data.remove(key);
        Ok(())
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), SecretError> {
        let mut data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        for (key, value) in entries {
            data.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    fn delete_many(&self, keys: &[&str]) -> Result<(), SecretError> {
        let mut data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        for key in keys {
            data.remove(*key);
        }
        Ok(())
    }
}
