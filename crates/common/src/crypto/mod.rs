//! Shared cryptographic primitives used by request signing.

pub mod signature;

pub use signature::{hmac_sha256_hex, SignatureError};
