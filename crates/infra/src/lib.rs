//! # Elixir Infrastructure
//!
//! Infrastructure implementations of the `elixir-core` ports.
//!
//! This crate contains:
//! - The reqwest HTTP transport
//! - Keychain-backed refresh token storage
//! - Configuration loading (environment, `.env`, TOML/JSON files, process
//!   arguments)
//! - Tracing initialisation and the broadcast overlay event channel
//! - The [`ElixirSdk`] facade wiring everything together
//!
//! ## Architecture
//! - Implements traits defined in `elixir-core`
//! - Contains all "impure" code (network, keychain, filesystem)

pub mod config;
pub mod errors;
pub mod events;
pub mod http;
pub mod logging;
pub mod sdk;
pub mod storage;

// Re-export commonly used items
pub use errors::InfraError;
pub use events::BroadcastEventPublisher;
pub use http::{ReqwestTransport, ReqwestTransportBuilder};
pub use sdk::ElixirSdk;
pub use storage::KeychainTokenStore;
