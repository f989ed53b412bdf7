//! Port interfaces for the session pipeline
//!
//! Adapters live in `elixir-infra`; in-memory doubles in [`crate::testing`].

use std::fmt;

use async_trait::async_trait;
use elixir_domain::{OverlayEvent, Result};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully signed request ready for the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub method: HttpMethod,
    /// Absolute URL (base URL + path).
    pub url: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl OutboundRequest {
    /// Case-insensitive header lookup.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Whatever the backend answered, before classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// The request produced no HTTP response at all
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportFailure {
    pub message: String,
}

impl TransportFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Trait for executing signed requests
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Execute a request and return the raw response, whatever its status.
    async fn execute(&self, request: OutboundRequest) -> std::result::Result<RawResponse, TransportFailure>;
}

/// Trait for persisting the refresh token across process restarts
pub trait TokenStore: Send + Sync {
    /// Load a value, `None` when nothing is stored.
    fn load(&self, key: &str) -> Result<Option<String>>;

    /// Store a value, replacing any previous one.
    fn save(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value (idempotent).
    fn delete(&self, key: &str) -> Result<()>;
}

/// Trait for forwarding overlay events to an external channel
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: OverlayEvent) -> Result<()>;
}

/// Publisher used when no overlay channel is attached
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
    fn publish(&self, _event: OverlayEvent) -> Result<()> {
        Ok(())
    }
}
