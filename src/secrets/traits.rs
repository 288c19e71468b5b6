//! secrets::traits
//!
//! The credential store contract.
//!
//! A store maps short namespaced keys (`session.token`, `session.user`,
//! `session.justLoggedOut`) to opaque strings. The session layer never writes a
//! token without its user record, so the batch calls [`SecretStore::set_many`]
//! and [`SecretStore::delete_many`] are the ones that matter; single-key calls
//! are for markers and diagnostics.
//!
//! Values are bearer material. No implementation may put a value into an
//! error, a log line, or a `Debug` rendering.

use thiserror::Error;

/// Failure talking to a credential store.
///
/// The payload describes the backing medium (path, keychain, lock), never a
/// stored value.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("credential store read failed: {0}")]
    Read(String),

    #[error("credential store write failed: {0}")]
    Write(String),

    #[error("credential store delete failed: {0}")]
    Delete(String),

    /// The configured provider cannot be used in this build or environment.
    #[error("credential store unavailable: {0}")]
    Unavailable(String),
}

/// Synchronous key-value access to saved credentials.
///
/// ```
/// use latchkey::secrets::{MemorySecretStore, SecretStore};
///
/// let store = MemorySecretStore::new();
/// store
///     .set_many(&[("session.token", "opaque"), ("session.user", "{}")])
///     .unwrap();
/// assert!(store.exists("session.user").unwrap());
///
/// store.delete_many(&["session.token", "session.user"]).unwrap();
/// assert!(store.get("session.token").unwrap().is_none());
/// ```
pub trait SecretStore: Send + Sync {
    /// Stored value for `key`, or `None` when absent.
    fn get(&self, key: &str) -> Result<Option<String>, SecretError>;

    /// Store `value` under `key`, replacing what was there.
    fn set(&self, key: &str, value: &str) -> Result<(), SecretError>;

    /// Remove `key`. Removing an absent key succeeds.
    fn delete(&self, key: &str) -> Result<(), SecretError>;

    fn exists(&self, key: &str) -> Result<bool, SecretError> {
        self.get(key).map(|value| value.is_some())
    }

    /// Store every entry. Media with a single-write commit override this so
    /// the entries land together.
    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), SecretError> {
        entries
            .iter()
            .try_for_each(|(key, value)| self.set(key, value))
    }

    /// Remove every key, carrying on past failures and reporting the first.
    fn delete_many(&self, keys: &[&str]) -> Result<(), SecretError> {
        keys.iter()
            .map(|key| self.delete(key))
            .fold(Ok(()), |acc, result| acc.and(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Store that refuses to delete one key.
    struct StuckKeyStore {
        data: Mutex<HashMap<String, String>>,
        stuck: &'static str,
    }

    impl StuckKeyStore {
        fn new(stuck: &'static str) -> Self {
            Self {
                data: Mutex::new(HashMap::new()),
                stuck,
            }
        }
    }

    impl SecretStore for StuckKeyStore {
        fn get(&self, key: &str) -> Result<Option<String>, SecretError> {
            Ok(self.data.lock().unwrap().get(key).cloned())
        }

        fn set(&self, key: &str, value: &str) -> Result<(), SecretError> {
            self.data.lock().unwrap().insert(key.into(), value.into());
            Ok(())
        }

        fn delete(&self, key: &str) -> Result<(), SecretError> {
            if key == self.stuck {
                return Err(SecretError::Delete(format!("{} is locked", key)));
            }
            self.data.lock().unwrap().remove(key);
            Ok(())
        }
    }

    #[test]
    fn messages_name_the_operation() {
        assert!(SecretError::Read("x".into()).to_string().contains("read failed"));
        assert!(SecretError::Write("x".into()).to_string().contains("write failed"));
        assert!(SecretError::Delete("x".into()).to_string().contains("delete failed"));
        assert!(SecretError::Unavailable("keychain".into())
            .to_string()
            .contains("unavailable: keychain"));
    }

    #[test]
    fn fallback_set_many_stores_token_and_user() {
        let store = StuckKeyStore::new("");
        store
            .set_many(&[("session.token", "tok"), ("session.user", "{\"id\":\"1\"}")])
            .unwrap();

        assert!(store.exists("session.token").unwrap());
        assert!(store.exists("session.user").unwrap());
    }

    #[test]
    fn fallback_delete_many_clears_the_rest_and_reports_first_failure() {
        let store = StuckKeyStore::new("session.token");
        store.set("session.token", "tok").unwrap();
        store.set("session.user", "{}").unwrap();

        let err = store
            .delete_many(&["session.token", "session.user"])
            .unwrap_err();

        assert!(err.to_string().contains("session.token is locked"));
        assert!(!store.exists("session.user").unwrap());
    }
}
