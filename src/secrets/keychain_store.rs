//! secrets::keychain_store
//!
//! Saved credentials in the platform keychain through `keyring`, one entry
//! per key under the `latchkey` service.
//!
//! A keychain cannot commit several entries at once. `set_many` writes in
//! order and removes what it already wrote when a later entry fails, so a
//! token is never left behind without its user record.
//!
//! Without the `keychain` feature the type still exists, but opening it
//! reports the provider as unavailable.

use super::traits::{SecretError, SecretStore};

/// Keychain service that owns every entry.
pub const KEYCHAIN_SERVICE: &str = "latchkey";

#[cfg(feature = "keychain")]
pub use enabled::KeychainSecretStore;

#[cfg(not(feature = "keychain"))]
pub use disabled::KeychainSecretStore;

#[cfg(feature = "keychain")]
mod enabled {
    use keyring::{Entry, Error as KeyringError};

    use super::{SecretError, SecretStore, KEYCHAIN_SERVICE};

    #[derive(Debug)]
    pub struct KeychainSecretStore {
        service: String,
    }

    impl KeychainSecretStore {
        pub fn new() -> Result<Self, SecretError> {
            Ok(Self::for_service(KEYCHAIN_SERVICE))
        }

        /// Store filed under another service name; used to keep tests apart.
        pub fn for_service(service: impl Into<String>) -> Self {
            Self {
                service: service.into(),
            }
        }

        fn entry(&self, key: &str) -> Result<Entry, SecretError> {
            Entry::new(&self.service, key).map_err(|e| {
                SecretError::Unavailable(format!("keychain entry {}/{}: {}", self.service, key, e))
            })
        }
    }

    impl SecretStore for KeychainSecretStore {
        fn get(&self, key: &str) -> Result<Option<String>, SecretError> {
            match self.entry(key)?.get_password() {
                Ok(value) => Ok(Some(value)),
                Err(KeyringError::NoEntry) => Ok(None),
                Err(e) => Err(SecretError::Read(format!("keychain {}: {}", key, e))),
            }
        }

        fn set(&self, key: &str, value: &str) -> Result<(), SecretError> {
            self.entry(key)?
                .set_password(value)
                .map_err(|e| SecretError::Write(format!("keychain {}: {}", key, e)))
        }

        fn delete(&self, key: &str) -> Result<(), SecretError> {
            match self.entry(key)?.delete_credential() {
                Ok(()) | Err(KeyringError::NoEntry) => Ok(()),
                Err(e) => Err(SecretError::Delete(format!("keychain {}: {}", key, e))),
            }
        }

        fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), SecretError> {
            for (index, (key, value)) in entries.iter().enumerate() {
                let Err(err) = self.set(key, value) else {
                    continue;
                };
                for (written, _) in &entries[..index] {
                    if let Err(undo) = self.delete(written) {
                        tracing::warn!(key = %written, error = %undo, "could not undo partial keychain write");
                    }
                }
                return Err(err);
            }
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        // Touches the real keychain under a per-process service.
        fn scratch() -> KeychainSecretStore {
            KeychainSecretStore::for_service(format!("latchkey-test-{}", std::process::id()))
        }

        #[test]
        fn session_pair_round_trips_through_keychain() {
            let store = scratch();
            let _ = store.delete_many(&["session.token", "session.user"]);

            store
                .set_many(&[("session.token", "tok"), ("session.user", "{}")])
                .unwrap();
            assert_eq!(store.get("session.token").unwrap().as_deref(), Some("tok"));

            store.delete_many(&["session.token", "session.user"]).unwrap();
            assert!(!store.exists("session.user").unwrap());
        }
    }
}

#[cfg(not(feature = "keychain"))]
mod disabled {
    use super::{SecretError, SecretStore};

    const MISSING: &str = "keychain support is not built in (rebuild with --features keychain)";

    #[derive(Debug)]
    pub struct KeychainSecretStore {
        _unconstructible: (),
    }

    impl KeychainSecretStore {
        pub fn new() -> Result<Self, SecretError> {
            Err(SecretError::Unavailable(MISSING.into()))
        }
    }

    impl SecretStore for KeychainSecretStore {
        fn get(&self, _key: &str) -> Result<Option<String>, SecretError> {
            Err(SecretError::Unavailable(MISSING.into()))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), SecretError> {
            Err(SecretError::Unavailable(MISSING.into()))
        }

        fn delete(&self, _key: &str) -> Result<(), SecretError> {
            Err(SecretError::Unavailable(MISSING.into()))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn opening_reports_missing_feature() {
            let err = KeychainSecretStore::new().unwrap_err();
            assert!(matches!(err, SecretError::Unavailable(_)));
        }
    }
}
