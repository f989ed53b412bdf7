//! Response classification
//!
//! Normalises every transport outcome into `Ok(T)` or an [`ElixirError`]
//! carrying an [`ApiError`]. The backend has shipped two incompatible
//! envelope generations; which one is spoken is a deployment setting resolved
//! once into an [`EnvelopeStrategy`].
//!
//! Rules, in order:
//! 1. No response ⇒ `Transport{0, -1, message}`.
//! 2. Refresh-token exchange answered with 4xx ⇒ `InvalidRefreshToken`.
//! 3. Empty body ⇒ `T::default()` on 2xx, `BackendRejected` otherwise.
//! 4. Bare JSON array on 2xx ⇒ decoded directly, no envelope.
//! 5. JSON object ⇒ envelope errors win over the HTTP status; a non-2xx
//!    status without envelope error is still a rejection.
//! 6. Success payload is `data` decoded over `T::default()`.

use elixir_domain::constants::UNSPECIFIED_ERROR_CODE;
use elixir_domain::{ApiError, ElixirError, EnvelopeFormat, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::ports::{RawResponse, TransportFailure};

/// Which kind of exchange produced the response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExchangeKind {
    #[default]
    Standard,
    /// `POST /session/refresh`: a 4xx means the refresh token is dead.
    RefreshTokenExchange,
}

/// Envelope generation spoken by the backend
pub trait EnvelopeStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Failure reported by the envelope itself, if any.
    fn rejection(&self, envelope: &Map<String, Value>, http_status: u16) -> Option<ApiError>;
}

/// `{ success, code, message, data }`
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatEnvelope;

impl EnvelopeStrategy for FlatEnvelope {
    fn name(&self) -> &'static str {
        "flat"
    }

    fn rejection(&self, envelope: &Map<String, Value>, http_status: u16) -> Option<ApiError> {
        if envelope.get("success").and_then(Value::as_bool) == Some(true) {
            return None;
        }
        Some(ApiError::new(
            http_status,
            int_field(envelope, "code").unwrap_or(UNSPECIFIED_ERROR_CODE),
            str_field(envelope, "message").unwrap_or_else(|| format!("HTTP {http_status}")),
        ))
    }
}

/// `{ code, success, error: { code, message, status }, data }`
#[derive(Debug, Clone, Copy, Default)]
pub struct NestedEnvelope;

impl EnvelopeStrategy for NestedEnvelope {
    fn name(&self) -> &'static str {
        "nested"
    }

    fn rejection(&self, envelope: &Map<String, Value>, http_status: u16) -> Option<ApiError> {
        if let Some(error) = envelope.get("error").and_then(Value::as_object) {
            if !error.is_empty() {
                return Some(ApiError::new(
                    http_status,
                    int_field(error, "code")
                        .or_else(|| int_field(envelope, "code"))
                        .unwrap_or(UNSPECIFIED_ERROR_CODE),
                    str_field(error, "message").unwrap_or_else(|| format!("HTTP {http_status}")),
                ));
            }
        }

        if envelope.get("success").and_then(Value::as_bool) == Some(false) {
            return Some(ApiError::new(
                http_status,
                int_field(envelope, "code").unwrap_or(UNSPECIFIED_ERROR_CODE),
                str_field(envelope, "message").unwrap_or_else(|| format!("HTTP {http_status}")),
            ));
        }

        None
    }
}

fn int_field(map: &Map<String, Value>, key: &str) -> Option<i32> {
    map.get(key).and_then(Value::as_i64).and_then(|code| i32::try_from(code).ok())
}

fn str_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Turns transport outcomes into typed results
pub struct ResponseClassifier {
    strategy: Box<dyn EnvelopeStrategy>,
}

impl ResponseClassifier {
    pub fn new(format: EnvelopeFormat) -> Self {
        match format {
            EnvelopeFormat::Flat => Self::with_strategy(Box::new(FlatEnvelope)),
            EnvelopeFormat::Nested => Self::with_strategy(Box::new(NestedEnvelope)),
        }
    }

    pub fn with_strategy(strategy: Box<dyn EnvelopeStrategy>) -> Self {
        Self { strategy }
    }

    #[must_use]
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Classify one exchange.
    ///
    /// # Errors
    /// See the module documentation for the mapping.
    pub fn classify<T>(
        &self,
        outcome: std::result::Result<RawResponse, TransportFailure>,
        kind: ExchangeKind,
    ) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        let response = outcome.map_err(|failure| {
            ElixirError::Transport(ApiError::transport(failure.message))
        })?;
        let status = response.status;
        let body = response.body.trim();
        let envelope = serde_json::from_str::<Value>(body).ok();

        if kind == ExchangeKind::RefreshTokenExchange && (400..500).contains(&status) {
            let error = envelope
                .as_ref()
                .and_then(Value::as_object)
                .and_then(|map| self.strategy.rejection(map, status))
                .unwrap_or_else(|| ApiError::from_status(status));
            return Err(ElixirError::InvalidRefreshToken(error));
        }

        if body.is_empty() {
            return if response.is_success() {
                Ok(T::default())
            } else {
                Err(ElixirError::BackendRejected(ApiError::from_status(status)))
            };
        }

        match envelope {
            Some(Value::Array(items)) if response.is_success() => {
                serde_json::from_value(Value::Array(items)).map_err(ElixirError::from)
            }
            Some(Value::Object(map)) => {
                if let Some(error) = self.strategy.rejection(&map, status) {
                    return Err(ElixirError::BackendRejected(error));
                }
                if !response.is_success() {
                    return Err(ElixirError::BackendRejected(ApiError::from_status(status)));
                }
                match map.get("data") {
                    None | Some(Value::Null) => Ok(T::default()),
                    Some(data) => serde_json::from_value(data.clone()).map_err(ElixirError::from),
                }
            }
            _ if !response.is_success() => {
                Err(ElixirError::BackendRejected(ApiError::from_status(status)))
            }
            _ => Err(ElixirError::Decode(format!(
                "unexpected response body for HTTP {status}"
            ))),
        }
    }
}

impl Default for ResponseClassifier {
    fn default() -> Self {
        Self::new(EnvelopeFormat::default())
    }
}
