//! Conversions from external infrastructure errors into domain errors.

use elixir_common::KeychainError;
use elixir_core::TransportFailure;
use elixir_domain::{ApiError, ElixirError};
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub ElixirError);

impl From<InfraError> for ElixirError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<ElixirError> for InfraError {
    fn from(value: ElixirError) -> Self {
        Self(value)
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → ElixirError */
/* -------------------------------------------------------------------------- */

impl From<HttpError> for InfraError {
    fn from(err: HttpError) -> Self {
        if err.is_builder() {
            return Self(ElixirError::MissingConfiguration(format!("http client: {err}")));
        }
        let status = err.status().map_or(0, |status| status.as_u16());
        Self(ElixirError::Transport(ApiError::new(status, -1, describe_http_error(&err))))
    }
}

/// Describe a reqwest failure for the transport port.
pub fn transport_failure(err: &HttpError) -> TransportFailure {
    TransportFailure::new(describe_http_error(err))
}

fn describe_http_error(err: &HttpError) -> String {
    let kind = if err.is_timeout() {
        "timeout"
    } else if err.is_connect() {
        "connect"
    } else if err.is_body() || err.is_decode() {
        "body"
    } else {
        "request"
    };
    format!("http {kind} error: {err}")
}

/* -------------------------------------------------------------------------- */
/* KeychainError → ElixirError */
/* -------------------------------------------------------------------------- */

impl From<KeychainError> for InfraError {
    fn from(err: KeychainError) -> Self {
        match err {
            KeychainError::NotFound => Self(ElixirError::Storage("secret not found".to_string())),
            KeychainError::AccessFailed(message) => Self(ElixirError::Storage(message)),
        }
    }
}

/* -------------------------------------------------------------------------- */
/* Config parsing → ElixirError */
/* -------------------------------------------------------------------------- */

impl From<toml::de::Error> for InfraError {
    fn from(err: toml::de::Error) -> Self {
        Self(ElixirError::MissingConfiguration(format!("Invalid TOML format: {err}")))
    }
}

impl From<std::io::Error> for InfraError {
    fn from(err: std::io::Error) -> Self {
        Self(ElixirError::MissingConfiguration(format!("Failed to read config file: {err}")))
    }
}
