//! Test doubles for platform services.
//!
//! Enabled with the `test-utils` feature (and always under `cfg(test)`), so
//! downstream crates can exercise secret storage without a real keychain.

#[cfg(feature = "platform")]
pub mod mocks;

#[cfg(feature = "platform")]
pub use mocks::MockKeychainProvider;
