use std::sync::Arc;

use elixir_common::{KeychainError, KeychainProvider, SecretStore};
use elixir_core::TokenStore;
use elixir_domain::Result;
use tracing::debug;

use crate::errors::InfraError;

/// [`TokenStore`] backed by an OS keychain (or any [`SecretStore`]).
#[derive(Clone)]
pub struct KeychainTokenStore {
    secrets: Arc<dyn SecretStore>,
}

impl KeychainTokenStore {
    pub fn new(secrets: Arc<dyn SecretStore>) -> Self {
        Self { secrets }
    }

    /// Store backed by the platform keychain under `service`.
    pub fn keychain(service: impl Into<String>) -> Self {
        Self::new(Arc::new(KeychainProvider::new(service)))
    }
}

impl std::fmt::Debug for KeychainTokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeychainTokenStore").finish_non_exhaustive()
    }
}

impl TokenStore for KeychainTokenStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        match self.secrets.get_secret(key) {
            Ok(value) if value.is_empty() => Ok(None),
            Ok(value) => Ok(Some(value)),
            Err(KeychainError::NotFound) => Ok(None),
            Err(err) => Err(InfraError::from(err).into()),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        debug!(key, "persisting secret");
        self.secrets.set_secret(key, value).map_err(|err| InfraError::from(err).into())
    }

    fn delete(&self, key: &str) -> Result<()> {
        debug!(key, "deleting secret");
        match self.secrets.delete_secret(key) {
            Ok(()) | Err(KeychainError::NotFound) => Ok(()),
            Err(err) => Err(InfraError::from(err).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use elixir_common::testing::MockKeychainProvider;
    use elixir_domain::ElixirError;

    use super::*;

    #[test]
    fn load_returns_none_when_nothing_is_stored() {
        let store = KeychainTokenStore::new(Arc::new(MockKeychainProvider::default()));
        assert_eq!(store.load("Elixir.RefreshToken.sandbox").unwrap(), None);
    }

    #[test]
    fn save_then_load_and_delete() {
        let secrets = MockKeychainProvider::default();
        let store = KeychainTokenStore::new(Arc::new(secrets.clone()));

        store.save("Elixir.RefreshToken.sandbox", "refresh-1").unwrap();
        assert_eq!(store.load("Elixir.RefreshToken.sandbox").unwrap().as_deref(), Some("refresh-1"));
        assert_eq!(secrets.len(), 1);

        store.delete("Elixir.RefreshToken.sandbox").unwrap();
        store.delete("Elixir.RefreshToken.sandbox").unwrap();
        assert!(secrets.is_empty());
    }

    struct LockedKeychain;

    impl SecretStore for LockedKeychain {
        fn set_secret(&self, _key: &str, _value: &str) -> std::result::Result<(), KeychainError> {
            Err(KeychainError::AccessFailed("keychain locked".to_string()))
        }

        fn get_secret(&self, _key: &str) -> std::result::Result<String, KeychainError> {
            Err(KeychainError::AccessFailed("keychain locked".to_string()))
        }

        fn delete_secret(&self, _key: &str) -> std::result::Result<(), KeychainError> {
            Err(KeychainError::AccessFailed("keychain locked".to_string()))
        }
    }

    #[test]
    fn access_failures_surface_as_storage_errors() {
        let store = KeychainTokenStore::new(Arc::new(LockedKeychain));
        assert_eq!(
            store.load("k").unwrap_err(),
            ElixirError::Storage("keychain locked".to_string())
        );
        assert!(matches!(store.save("k", "v"), Err(ElixirError::Storage(_))));
        assert!(matches!(store.delete("k"), Err(ElixirError::Storage(_))));
    }
}
