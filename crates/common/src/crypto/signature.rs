//! HMAC-SHA256 message authentication for outbound API requests.
//!
//! The legacy API generation authenticates every request with a keyed hash
//! over a timestamped payload. This module only computes the digest; payload
//! layout belongs to the request signer in `elixir-core`.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Errors produced while computing request signatures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    /// The shared secret could not be used as an HMAC key.
    #[error("invalid signing key: {0}")]
    InvalidKey(String),
}

/// Compute `hex(HMAC-SHA256(secret, payload))` using lowercase hex digits.
///
/// # Errors
/// Returns [`SignatureError::InvalidKey`] if the key is rejected by the MAC
/// implementation.
pub fn hmac_sha256_hex(secret: &[u8], payload: &[u8]) -> Result<String, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|err| SignatureError::InvalidKey(err.to_string()))?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}
