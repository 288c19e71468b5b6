//! secrets
//!
//! Where a saved session lives between runs.
//!
//! The session layer talks to a `dyn SecretStore` chosen by the
//! `secrets.provider` config key:
//!
//! | provider   | store                   | survives exit |
//! |------------|-------------------------|---------------|
//! | `file`     | [`FileSecretStore`]     | yes           |
//! | `memory`   | [`MemorySecretStore`]   | no            |
//! | `keychain` | [`KeychainSecretStore`] | yes, needs the `keychain` feature |
//!
//! Stored values are bearer tokens and user records and are kept out of logs
//! and error text by every store.

mod file_store;
mod keychain_store;
mod memory_store;
mod traits;

pub use file_store::FileSecretStore;
pub use keychain_store::{KeychainSecretStore, KEYCHAIN_SERVICE};
pub use memory_store::MemorySecretStore;
pub use traits::{SecretError, SecretStore};

/// Provider used when the config does not name one.
pub const DEFAULT_PROVIDER: &str = "file";

/// Accepted values for `secrets.provider`.
pub const VALID_PROVIDERS: &[&str] = &["file", "memory", "keychain"];

/// Open the store for `provider`.
pub fn create_store(provider: &str) -> Result<Box<dyn SecretStore>, SecretError> {
    let store: Box<dyn SecretStore> = match provider {
        "file" => Box::new(FileSecretStore::new()?),
        "memory" => Box::new(MemorySecretStore::new()),
        "keychain" => Box::new(KeychainSecretStore::new()?),
        other => {
            return Err(SecretError::Unavailable(format!(
                "no provider named '{}', choose one of {}",
                other,
                VALID_PROVIDERS.join(", ")
            )))
        }
    };
    tracing::debug!(provider, "opened credential store");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_provider_starts_empty() {
        let store = create_store("memory").unwrap();
        assert_eq!(store.get("session.token").unwrap(), None);
    }

    #[test]
    fn unknown_provider_lists_the_choices() {
        let err = create_store("vault").err().unwrap();

        assert!(matches!(err, SecretError::Unavailable(_)));
        let msg = err.to_string();
        assert!(msg.contains("'vault'"));
        assert!(msg.contains("file, memory, keychain"));
    }

    #[cfg(not(feature = "keychain"))]
    #[test]
    fn keychain_provider_needs_the_feature() {
        let err = create_store("keychain").err().unwrap();
        assert!(err.to_string().contains("--features keychain"));
    }

    #[test]
    fn default_is_a_known_provider() {
        assert!(VALID_PROVIDERS.contains(&DEFAULT_PROVIDER));
    }
}
