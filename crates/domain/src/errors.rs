//! Error types used throughout the SDK
//!
//! Every failure, whether the request never reached the backend or the
//! backend refused it, can be reduced to one [`ApiError`] shape
//! `{ http_status, domain_code, message }`.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{NO_WALLET_CODE, UNSPECIFIED_ERROR_CODE};

/// Normalised failure description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// HTTP status, `0` when no response was received
    pub http_status: u16,
    /// Backend error code, `-1` when the backend supplied none
    pub domain_code: i32,
    pub message: String,
}

impl ApiError {
    pub fn new(http_status: u16, domain_code: i32, message: impl Into<String>) -> Self {
        Self { http_status, domain_code, message: message.into() }
    }

    /// Failure that never produced an HTTP response.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(0, UNSPECIFIED_ERROR_CODE, message)
    }

    /// Non-2xx response without any envelope information.
    pub fn from_status(http_status: u16) -> Self {
        Self::new(http_status, UNSPECIFIED_ERROR_CODE, format!("HTTP {http_status}"))
    }

    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.http_status >= 400 && self.http_status < 500
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (http {}, code {})", self.message, self.http_status, self.domain_code)
    }
}

/// Main error type for the Elixir SDK
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail")]
pub enum ElixirError {
    /// The request never produced a response (DNS, TLS, connection reset, ...).
    #[error("Transport error: {0}")]
    Transport(ApiError),

    /// The backend answered but refused the request.
    #[error("Backend rejected request: {0}")]
    BackendRejected(ApiError),

    /// The refresh token exchange was refused with a 4xx. Terminal: the user
    /// must log in again.
    #[error("Refresh token rejected: {0}")]
    InvalidRefreshToken(ApiError),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Another login or refresh is already in flight.
    #[error("Busy: {0}")]
    Busy(String),

    #[error("No wallet")]
    NoWallet,
}

impl ElixirError {
    /// Uniform `{ http_status, domain_code, message }` view of this error.
    #[must_use]
    pub fn api_error(&self) -> ApiError {
        match self {
            Self::Transport(err) | Self::BackendRejected(err) | Self::InvalidRefreshToken(err) => {
                err.clone()
            }
            Self::NoWallet => ApiError::new(0, NO_WALLET_CODE, "No wallet"),
            other => ApiError::new(0, UNSPECIFIED_ERROR_CODE, other.to_string()),
        }
    }

    /// Whether recovering from this error needs a fresh login.
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        matches!(self, Self::NotAuthenticated | Self::InvalidRefreshToken(_))
    }

    /// Stable label for logs and metrics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::BackendRejected(_) => "backend_rejected",
            Self::InvalidRefreshToken(_) => "invalid_refresh_token",
            Self::NotAuthenticated => "not_authenticated",
            Self::MissingConfiguration(_) => "missing_configuration",
            Self::InvalidInput(_) => "invalid_input",
            Self::Decode(_) => "decode",
            Self::Storage(_) => "storage",
            Self::Timeout(_) => "timeout",
            Self::Busy(_) => "busy",
            Self::NoWallet => "no_wallet",
        }
    }
}

impl From<serde_json::Error> for ElixirError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Result type alias for Elixir SDK operations
pub type Result<T> = std::result::Result<T, ElixirError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_reduces_to_api_error() {
        let rejected = ElixirError::BackendRejected(ApiError::new(403, 12, "forbidden"));
        assert_eq!(rejected.api_error(), ApiError::new(403, 12, "forbidden"));

        let transport = ElixirError::Transport(ApiError::transport("connection reset"));
        assert_eq!(transport.api_error().http_status, 0);
        assert_eq!(transport.api_error().domain_code, -1);

        assert_eq!(ElixirError::NoWallet.api_error().domain_code, -2000);
        assert_eq!(ElixirError::NotAuthenticated.api_error().message, "Not authenticated");
    }

    #[test]
    fn requires_login_only_for_session_errors() {
        assert!(ElixirError::NotAuthenticated.requires_login());
        assert!(ElixirError::InvalidRefreshToken(ApiError::from_status(401)).requires_login());
        assert!(!ElixirError::Transport(ApiError::transport("x")).requires_login());
        assert!(!ElixirError::Busy("refresh".into()).requires_login());
    }

    #[test]
    fn from_status_formats_message() {
        let err = ApiError::from_status(503);
        assert_eq!(err.message, "HTTP 503");
        assert!(!err.is_client_error());
        assert!(ApiError::from_status(404).is_client_error());
    }

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_value(ElixirError::InvalidInput("email".into())).unwrap();
        assert_eq!(json["type"], "InvalidInput");
        assert_eq!(json["detail"], "email");
    }

    #[test]
    fn labels_are_stable() {
        assert_eq!(ElixirError::Timeout(Duration::from_secs(3)).label(), "timeout");
        assert_eq!(ElixirError::Decode("x".into()).label(), "decode");
    }
}
