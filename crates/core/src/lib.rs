//! # Elixir Core
//!
//! Session lifecycle and request pipeline - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces (HTTP transport, token store, event publisher)
//! - Request signing and response classification
//! - The session manager and its login/refresh/logout flows
//! - Feature clients built on the authenticated pipeline
//!
//! ## Architecture Principles
//! - Only depends on `elixir-common` and `elixir-domain`
//! - No HTTP client, keychain or filesystem code
//! - All external dependencies via traits

pub mod classifier;
pub mod features;
pub mod gateway;
pub mod ports;
pub mod session;
pub mod signer;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export specific items to avoid ambiguity
pub use classifier::{EnvelopeStrategy, ExchangeKind, FlatEnvelope, NestedEnvelope, ResponseClassifier};
pub use features::{NftClient, ReiClient, TournamentClient, UserClient};
pub use gateway::ApiGateway;
pub use ports::{
    EventPublisher, HttpMethod, HttpTransport, NoopPublisher, OutboundRequest, RawResponse,
    TokenStore, TransportFailure,
};
pub use session::{HandoffClaim, QrHandoff, SessionManager, SessionManagerBuilder};
pub use signer::{signing_payload, RequestSigner};
