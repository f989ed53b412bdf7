//! Platform secret storage.
//!
//! - [`keychain`]: `SecretStore` trait and the `keyring`-backed
//!   [`KeychainProvider`] used to persist refresh tokens and signing secrets.

pub mod keychain;

pub use keychain::{KeychainError, KeychainProvider, SecretStore};
