//! Configuration loader
//!
//! Loads the SDK configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Reads a `.env` file when one is present (values already in the
//!    environment win)
//! 2. Attempts to load from environment variables (`ELIXIR_API_KEY` required)
//! 3. Falls back to a config file probed in standard locations
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `ELIXIR_API_KEY`: API key issued for the game (required)
//! - `ELIXIR_ENVIRONMENT`: `sandbox` or `production`
//! - `ELIXIR_BASE_URL`: Backend base URL
//! - `ELIXIR_SIGNING`: `bearer` or `hmac`
//! - `ELIXIR_HMAC_SECRET`: HMAC secret (otherwise read from the keychain)
//! - `ELIXIR_ENVELOPE`: `flat` or `nested`
//! - `ELIXIR_REFRESH_DRIVER`: `tick` or `timer`
//! - `ELIXIR_ALLOW_DEV_REI`: Fetch a development device key when none is given
//! - `ELIXIR_DEVICE_KEY`: Device key (normally passed as `-rei <value>`)
//! - `ELIXIR_DEVICE_MODEL`: Device model sent with OTP/QR verification
//! - `ELIXIR_DEVICE_ID`: Stable device identifier
//! - `ELIXIR_REQUEST_TIMEOUT_SECS`: Per-request timeout in seconds
//! - `ELIXIR_CLOSE_TIMEOUT_SECS`: Bound on the close call at shutdown
//! - `ELIXIR_TRANSPORT_ATTEMPTS`: Attempts on transport-level failures
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./elixir.toml` or `./elixir.json` (current working directory)
//! 2. `./config.toml` or `./config.json` (current working directory)
//! 3. The same names in the parent and grandparent directories
//! 4. Relative to executable location

use std::path::{Path, PathBuf};
use std::time::Duration;

use elixir_common::{KeychainError, SecretStore};
use elixir_domain::{
    DeviceInfo, ElixirError, Environment, EnvelopeFormat, RefreshDriver, Result, SdkConfig,
    SigningMode,
};
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::errors::InfraError;

pub const ENV_API_KEY: &str = "ELIXIR_API_KEY";
pub const ENV_ENVIRONMENT: &str = "ELIXIR_ENVIRONMENT";
pub const ENV_BASE_URL: &str = "ELIXIR_BASE_URL";
pub const ENV_SIGNING: &str = "ELIXIR_SIGNING";
pub const ENV_HMAC_SECRET: &str = "ELIXIR_HMAC_SECRET";
pub const ENV_ENVELOPE: &str = "ELIXIR_ENVELOPE";
pub const ENV_REFRESH_DRIVER: &str = "ELIXIR_REFRESH_DRIVER";
pub const ENV_ALLOW_DEV_REI: &str = "ELIXIR_ALLOW_DEV_REI";
pub const ENV_DEVICE_KEY: &str = "ELIXIR_DEVICE_KEY";
pub const ENV_DEVICE_MODEL: &str = "ELIXIR_DEVICE_MODEL";
pub const ENV_DEVICE_ID: &str = "ELIXIR_DEVICE_ID";
pub const ENV_REQUEST_TIMEOUT: &str = "ELIXIR_REQUEST_TIMEOUT_SECS";
pub const ENV_CLOSE_TIMEOUT: &str = "ELIXIR_CLOSE_TIMEOUT_SECS";
pub const ENV_TRANSPORT_ATTEMPTS: &str = "ELIXIR_TRANSPORT_ATTEMPTS";

/// Keychain account holding the HMAC secret when it is not in the environment.
pub const HMAC_SECRET_ACCOUNT: &str = "Elixir.HmacSecret";
/// Keychain account holding the generated device identifier.
pub const DEVICE_ID_ACCOUNT: &str = "Elixir.DeviceId";

const CONFIG_FILE_NAMES: [&str; 4] = ["elixir.toml", "elixir.json", "config.toml", "config.json"];

/// Unresolved settings as they appear in a config file or the environment.
///
/// Every field is optional; [`ConfigFile::into_config`] applies defaults and
/// resolves secrets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub api_key: Option<String>,
    pub environment: Option<String>,
    pub base_url: Option<String>,
    pub signing: Option<String>,
    pub envelope: Option<String>,
    pub refresh_driver: Option<String>,
    pub allow_dev_device_key: Option<bool>,
    pub device_key: Option<String>,
    pub device_model: Option<String>,
    pub device_id: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub close_session_timeout_secs: Option<u64>,
    pub transport_attempts: Option<u32>,
}

impl ConfigFile {
    /// Resolve defaults and secrets into a validated [`SdkConfig`].
    ///
    /// `env` supplies `ELIXIR_HMAC_SECRET`; without it the secret is read
    /// from `secrets`.
    ///
    /// # Errors
    /// Returns `MissingConfiguration` for unknown enum values, an invalid
    /// base URL, a missing HMAC secret or a config failing
    /// [`SdkConfig::validate`].
    pub fn into_config<F>(self, secrets: &dyn SecretStore, env: F) -> Result<SdkConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = SdkConfig { api_key: non_empty(self.api_key), ..SdkConfig::default() };

        if let Some(environment) = self.environment {
            config.environment = environment.parse::<Environment>()?;
        }
        if let Some(base_url) = self.base_url {
            config.base_url = normalize_base_url(&base_url)?;
        }
        if let Some(envelope) = self.envelope {
            config.envelope = envelope.parse::<EnvelopeFormat>()?;
        }
        if let Some(driver) = self.refresh_driver {
            config.refresh_driver = driver.parse::<RefreshDriver>()?;
        }
        config.signing = resolve_signing(self.signing.as_deref(), secrets, &env)?;
        config.allow_dev_device_key = self.allow_dev_device_key.unwrap_or(false);
        config.device_key = non_empty(self.device_key);
        config.device = DeviceInfo {
            model: non_empty(self.device_model).unwrap_or_else(default_device_model),
            unique_identifier: resolve_device_id(non_empty(self.device_id), secrets),
        };
        if let Some(secs) = self.request_timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.close_session_timeout_secs {
            config.close_session_timeout = Duration::from_secs(secs);
        }
        if let Some(attempts) = self.transport_attempts {
            config.transport_attempts = attempts;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Load configuration with automatic fallback strategy
///
/// Reads `.env` if present, then tries environment variables, then a
/// probed config file.
///
/// # Errors
/// Returns `MissingConfiguration` if neither source yields a valid
/// configuration.
pub fn load(secrets: &dyn SecretStore) -> Result<SdkConfig> {
    match dotenvy::dotenv() {
        Ok(path) => debug!(path = %path.display(), "Loaded .env file"),
        Err(err) if err.not_found() => {}
        Err(err) => warn!(error = %err, "Ignoring unreadable .env file"),
    }

    match load_from_env(secrets) {
        Ok(config) => {
            info!(environment = %config.environment, "Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None, secrets)
        }
    }
}

/// Load configuration from process environment variables
///
/// # Errors
/// Returns `MissingConfiguration` if `ELIXIR_API_KEY` is missing or any value
/// is invalid.
pub fn load_from_env(secrets: &dyn SecretStore) -> Result<SdkConfig> {
    load_from_lookup(|key| std::env::var(key).ok(), secrets)
}

/// Load configuration from an arbitrary variable lookup.
///
/// # Errors
/// Same as [`load_from_env`].
pub fn load_from_lookup<F>(lookup: F, secrets: &dyn SecretStore) -> Result<SdkConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let api_key = lookup(ENV_API_KEY).filter(|value| !value.is_empty()).ok_or_else(|| {
        ElixirError::MissingConfiguration(format!(
            "Missing required environment variable: {ENV_API_KEY}"
        ))
    })?;

    let settings = ConfigFile {
        api_key: Some(api_key),
        environment: lookup(ENV_ENVIRONMENT),
        base_url: lookup(ENV_BASE_URL),
        signing: lookup(ENV_SIGNING),
        envelope: lookup(ENV_ENVELOPE),
        refresh_driver: lookup(ENV_REFRESH_DRIVER),
        allow_dev_device_key: lookup(ENV_ALLOW_DEV_REI).map(|value| parse_bool(&value)),
        device_key: lookup(ENV_DEVICE_KEY),
        device_model: lookup(ENV_DEVICE_MODEL),
        device_id: lookup(ENV_DEVICE_ID),
        request_timeout_secs: parse_number(ENV_REQUEST_TIMEOUT, lookup(ENV_REQUEST_TIMEOUT))?,
        close_session_timeout_secs: parse_number(ENV_CLOSE_TIMEOUT, lookup(ENV_CLOSE_TIMEOUT))?,
        transport_attempts: parse_number(ENV_TRANSPORT_ATTEMPTS, lookup(ENV_TRANSPORT_ATTEMPTS))?,
    };

    settings.into_config(secrets, lookup)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations via
/// [`probe_config_paths`]. Format is chosen by extension (`.toml` or
/// `.json`).
///
/// # Errors
/// Returns `MissingConfiguration` if the file is missing, unreadable,
/// malformed or incomplete.
pub fn load_from_file(path: Option<PathBuf>, secrets: &dyn SecretStore) -> Result<SdkConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ElixirError::MissingConfiguration(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            ElixirError::MissingConfiguration(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path).map_err(InfraError::from)?;
    parse_config(&contents, &config_path)?.into_config(secrets, |key| std::env::var(key).ok())
}

fn parse_config(contents: &str, path: &Path) -> Result<ConfigFile> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => Ok(toml::from_str(contents).map_err(InfraError::from)?),
        "json" => serde_json::from_str(contents).map_err(|e| {
            ElixirError::MissingConfiguration(format!("Invalid JSON format: {e}"))
        }),
        _ => Err(ElixirError::MissingConfiguration(format!(
            "Unsupported config format: {extension}"
        ))),
    }
}

/// Probe standard paths for a configuration file
///
/// Searches the current working directory, its two parents, then the
/// executable's directory and its two parents.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd);
    }
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.push(exe_dir.to_path_buf());
        }
    }

    roots
        .iter()
        .flat_map(|root| [root.clone(), root.join(".."), root.join("../..")])
        .flat_map(|dir| CONFIG_FILE_NAMES.map(|name| dir.join(name)))
        .find(|path| path.exists())
}

fn resolve_signing<F>(mode: Option<&str>, secrets: &dyn SecretStore, env: &F) -> Result<SigningMode>
where
    F: Fn(&str) -> Option<String>,
{
    match mode.map(|m| m.trim().to_ascii_lowercase()).as_deref() {
        None | Some("" | "bearer") => Ok(SigningMode::Bearer),
        Some("hmac") => {
            let secret = match env(ENV_HMAC_SECRET).filter(|value| !value.is_empty()) {
                Some(secret) => secret,
                None => match secrets.get_secret(HMAC_SECRET_ACCOUNT) {
                    Ok(secret) if !secret.is_empty() => secret,
                    Ok(_) | Err(KeychainError::NotFound) => {
                        return Err(ElixirError::MissingConfiguration(format!(
                            "hmac signing requires {ENV_HMAC_SECRET} or a keychain entry '{HMAC_SECRET_ACCOUNT}'"
                        )));
                    }
                    Err(err) => return Err(InfraError::from(err).into()),
                },
            };
            Ok(SigningMode::Hmac { secret })
        }
        Some(other) => {
            Err(ElixirError::MissingConfiguration(format!("unknown signing mode '{other}'")))
        }
    }
}

/// Configured identifier, else the persisted one, else a fresh UUID that is
/// persisted for the next launch.
fn resolve_device_id(configured: Option<String>, secrets: &dyn SecretStore) -> String {
    if let Some(id) = configured {
        return id;
    }
    if let Ok(id) = secrets.get_secret(DEVICE_ID_ACCOUNT) {
        if !id.is_empty() {
            return id;
        }
    }

    let id = uuid::Uuid::new_v4().to_string();
    if let Err(err) = secrets.set_secret(DEVICE_ID_ACCOUNT, &id) {
        warn!(error = %err, "Could not persist generated device id");
    }
    id
}

fn default_device_model() -> String {
    format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH)
}

fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let parsed = Url::parse(trimmed)
        .map_err(|e| ElixirError::MissingConfiguration(format!("Invalid base URL '{trimmed}': {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ElixirError::MissingConfiguration(format!(
            "Unsupported base URL scheme '{}'",
            parsed.scheme()
        )));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn parse_number<T>(key: &str, value: Option<String>) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ElixirError::MissingConfiguration(format!("Invalid {key}: {e}")))
        })
        .transpose()
}
