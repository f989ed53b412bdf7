//! SDK configuration structures
//!
//! Resolved once at startup (see `elixir_infra::config::loader`) and then
//! treated as immutable.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    CLOSE_SESSION_TIMEOUT, DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT, NEW_ACCOUNT_GRACE,
    REFRESH_MARGIN, REFRESH_TOKEN_KEY_PREFIX,
};
use crate::errors::{ElixirError, Result};

/// Backend environment the SDK talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Sandbox,
    Production,
}

impl Environment {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sandbox => "sandbox",
            Self::Production => "production",
        }
    }

    /// Storage key of the persisted refresh token, qualified by environment
    /// so sandbox and production sessions never overwrite each other.
    #[must_use]
    pub fn refresh_token_key(self) -> String {
        format!("{REFRESH_TOKEN_KEY_PREFIX}.{}", self.as_str())
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ElixirError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sandbox" | "dev" | "development" => Ok(Self::Sandbox),
            "production" | "prod" => Ok(Self::Production),
            other => Err(ElixirError::MissingConfiguration(format!("unknown environment '{other}'"))),
        }
    }
}

/// How requests prove their origin to the backend
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum SigningMode {
    /// `Authorization: Bearer <token>` only.
    #[default]
    Bearer,
    /// Bearer plus `x-api-time` / `x-api-signature` computed with HMAC-SHA256.
    Hmac { secret: String },
}

impl SigningMode {
    #[must_use]
    pub const fn is_hmac(&self) -> bool {
        matches!(self, Self::Hmac { .. })
    }
}

impl fmt::Debug for SigningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bearer => f.write_str("Bearer"),
            Self::Hmac { .. } => f.debug_struct("Hmac").field("secret", &"<redacted>").finish(),
        }
    }
}

/// Response envelope generation spoken by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeFormat {
    /// `{ success, code, message, data }`
    Flat,
    /// `{ code, success, error: { code, message, status }, data }`
    #[default]
    Nested,
}

impl FromStr for EnvelopeFormat {
    type Err = ElixirError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "flat" | "legacy" => Ok(Self::Flat),
            "nested" => Ok(Self::Nested),
            other => Err(ElixirError::MissingConfiguration(format!("unknown envelope '{other}'"))),
        }
    }
}

/// What drives the silent refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshDriver {
    /// The host calls `check_token(elapsed)` from its frame loop.
    #[default]
    Tick,
    /// A cancellable tokio task fires once per grant.
    Timer,
}

impl FromStr for RefreshDriver {
    type Err = ElixirError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tick" => Ok(Self::Tick),
            "timer" => Ok(Self::Timer),
            other => {
                Err(ElixirError::MissingConfiguration(format!("unknown refresh driver '{other}'")))
            }
        }
    }
}

/// Device identity sent with OTP and QR verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub model: String,
    pub unique_identifier: String,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self { model: "unknown".to_string(), unique_identifier: String::new() }
    }
}

/// Complete SDK configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkConfig {
    pub environment: Environment,
    pub base_url: String,
    pub api_key: Option<String>,
    pub signing: SigningMode,
    pub envelope: EnvelopeFormat,
    pub refresh_driver: RefreshDriver,
    /// Allow fetching a development device key when none is supplied.
    pub allow_dev_device_key: bool,
    /// Device key supplied by process arguments or configuration.
    pub device_key: Option<String>,
    pub device: DeviceInfo,
    pub request_timeout: Duration,
    pub close_session_timeout: Duration,
    /// Refresh this long before the token lifetime elapses.
    pub refresh_margin: Duration,
    /// Delay before a new-account login resolves.
    pub new_account_grace: Duration,
    /// Attempts the HTTP transport makes on transport-level failures.
    pub transport_attempts: u32,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            signing: SigningMode::default(),
            envelope: EnvelopeFormat::default(),
            refresh_driver: RefreshDriver::default(),
            allow_dev_device_key: false,
            device_key: None,
            device: DeviceInfo::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            close_session_timeout: CLOSE_SESSION_TIMEOUT,
            refresh_margin: REFRESH_MARGIN,
            new_account_grace: NEW_ACCOUNT_GRACE,
            transport_attempts: 1,
        }
    }
}

impl SdkConfig {
    pub fn new(api_key: impl Into<String>, environment: Environment) -> Self {
        Self { api_key: Some(api_key.into()), environment, ..Self::default() }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_signing(mut self, signing: SigningMode) -> Self {
        self.signing = signing;
        self
    }

    #[must_use]
    pub const fn with_envelope(mut self, envelope: EnvelopeFormat) -> Self {
        self.envelope = envelope;
        self
    }

    #[must_use]
    pub const fn with_refresh_driver(mut self, driver: RefreshDriver) -> Self {
        self.refresh_driver = driver;
        self
    }

    #[must_use]
    pub fn with_device_key(mut self, key: impl Into<String>) -> Self {
        self.device_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_device(mut self, device: DeviceInfo) -> Self {
        self.device = device;
        self
    }

    #[must_use]
    pub const fn with_dev_device_key(mut self, allow: bool) -> Self {
        self.allow_dev_device_key = allow;
        self
    }

    #[must_use]
    pub fn refresh_token_key(&self) -> String {
        self.environment.refresh_token_key()
    }

    /// Check the invariants every component relies on.
    ///
    /// # Errors
    /// Returns `MissingConfiguration` for an empty API key, an empty base URL,
    /// an HMAC mode without secret or zero transport attempts.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(ElixirError::MissingConfiguration("api_key".to_string()));
        }
        if self.base_url.trim().is_empty() {
            return Err(ElixirError::MissingConfiguration("base_url".to_string()));
        }
        if let SigningMode::Hmac { secret } = &self.signing {
            if secret.is_empty() {
                return Err(ElixirError::MissingConfiguration("hmac secret".to_string()));
            }
        }
        if self.transport_attempts == 0 {
            return Err(ElixirError::MissingConfiguration(
                "transport_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
