//! Generic keychain provider for secure credential storage
//!
//! Thin wrapper over the platform keychain for storing arbitrary string
//! secrets on macOS (Keychain Access), Windows (Credential Manager) and Linux
//! (Secret Service API).
//!
//! ## Usage
//!
//! ```no_run
//! use elixir_common::security::{KeychainProvider, SecretStore};
//!
//! let keychain = KeychainProvider::new("Elixir.sdk");
//! keychain.set_secret("Elixir.RefreshToken.sandbox", "opaque-refresh-token")?;
//! let secret = keychain.get_secret("Elixir.RefreshToken.sandbox")?;
//! assert_eq!(secret, "opaque-refresh-token");
//! # Ok::<(), elixir_common::security::KeychainError>(())
//! ```

use keyring::Entry;
use thiserror::Error;
use tracing::debug;

/// Key-value secret storage.
///
/// Implemented by the platform keychain and by the in-memory mock in
/// [`crate::testing`].
pub trait SecretStore: Send + Sync {
    /// Store a secret value, replacing any previous value.
    ///
    /// # Errors
    /// Returns `KeychainError::AccessFailed` if the backend rejects the write.
    fn set_secret(&self, key: &str, value: &str) -> Result<(), KeychainError>;

    /// Retrieve a secret value.
    ///
    /// # Errors
    /// Returns `KeychainError::NotFound` if nothing is stored under `key`.
    fn get_secret(&self, key: &str) -> Result<String, KeychainError>;

    /// Delete a secret (idempotent).
    ///
    /// # Errors
    /// Returns `KeychainError::AccessFailed` if the backend rejects the delete.
    fn delete_secret(&self, key: &str) -> Result<(), KeychainError>;

    /// Check if a secret exists.
    fn secret_exists(&self, key: &str) -> bool {
        self.get_secret(key).is_ok()
    }
}

/// Keychain provider scoped to one service name
pub struct KeychainProvider {
    service_name: String,
}

impl KeychainProvider {
    /// Create a new keychain provider for a specific service
    ///
    /// # Examples
    /// ```
    /// use elixir_common::security::KeychainProvider;
    ///
    /// let keychain = KeychainProvider::new("Elixir.sdk");
    /// assert_eq!(keychain.service_name(), "Elixir.sdk");
    /// ```
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into() }
    }

    /// Service name entries are namespaced under
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    fn create_entry(&self, account: &str) -> Result<Entry, KeychainError> {
        Entry::new(&self.service_name, account).map_err(|e| {
            KeychainError::AccessFailed(format!("Failed to create keychain entry: {e}"))
        })
    }
}

impl SecretStore for KeychainProvider {
    fn set_secret(&self, key: &str, value: &str) -> Result<(), KeychainError> {
        debug!(service = %self.service_name, key = %key, "Storing secret in keychain");

        let entry = self.create_entry(key)?;
        entry.set_password(value).map_err(|e| {
            KeychainError::AccessFailed(format!("Failed to store secret for {key}: {e}"))
        })?;

        Ok(())
    }

    fn get_secret(&self, key: &str) -> Result<String, KeychainError> {
        debug!(service = %self.service_name, key = %key, "Retrieving secret from keychain");

        let entry = self.create_entry(key)?;
        entry.get_password().map_err(|e| {
            if matches!(e, keyring::Error::NoEntry) {
                KeychainError::NotFound
            } else {
                KeychainError::AccessFailed(format!("Failed to retrieve secret for {key}: {e}"))
            }
        })
    }

    fn delete_secret(&self, key: &str) -> Result<(), KeychainError> {
        debug!(service = %self.service_name, key = %key, "Deleting secret from keychain");

        let entry = self.create_entry(key)?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(KeychainError::AccessFailed(format!(
                "Failed to delete secret for {key}: {e}"
            ))),
        }
    }
}

/// Keychain error types
#[derive(Debug, Error)]
pub enum KeychainError {
    /// Keychain access failed (permission denied, not available, etc.)
    #[error("Keychain access failed: {0}")]
    AccessFailed(String),

    /// Entry not found in keychain
    #[error("Entry not found")]
    NotFound,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockKeychainProvider;

    fn test_service_name() -> String {
        format!("ElixirTest.{}", uuid::Uuid::new_v4())
    }

    #[test]
    fn keychain_provider_keeps_service_name() {
        let keychain = KeychainProvider::new("test-service");
        assert_eq!(keychain.service_name(), "test-service");
    }

    #[test]
    fn mock_set_get_and_delete_secret() {
        let keychain = MockKeychainProvider::new(test_service_name());
        let key_id = "Elixir.RefreshToken.sandbox";

        keychain.set_secret(key_id, "super-secret").unwrap();
        assert!(keychain.secret_exists(key_id));
        assert_eq!(keychain.get_secret(key_id).unwrap(), "super-secret");

        keychain.delete_secret(key_id).unwrap();
        assert!(!keychain.secret_exists(key_id));
        assert!(matches!(keychain.get_secret(key_id), Err(KeychainError::NotFound)));
    }

    #[test]
    fn mock_delete_is_idempotent() {
        let keychain = MockKeychainProvider::default();
        keychain.delete_secret("missing").unwrap();
        keychain.delete_secret("missing").unwrap();
    }
}
