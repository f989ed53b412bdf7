//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading configuration from files.

use std::io::Write;

use elixir_common::testing::MockKeychainProvider;
use elixir_common::SecretStore;
use elixir_domain::{ElixirError, Environment, EnvelopeFormat, RefreshDriver, SigningMode};
use elixir_infra::config;
use tempfile::Builder;

#[test]
fn test_load_config_from_toml_file() {
    let toml_content = r#"
api_key = "toml-key"
environment = "production"
base_url = "https://kend.example.com/"
envelope = "flat"
refresh_driver = "timer"
allow_dev_device_key = true
device_model = "Desktop"
device_id = "device-7"
close_session_timeout_secs = 2
"#;

    let mut file = Builder::new().suffix(".toml").tempfile().expect("Failed to create temp file");
    file.write_all(toml_content.as_bytes()).expect("Failed to write to temp file");

    let secrets = MockKeychainProvider::default();
    let config = config::load_from_file(Some(file.path().to_path_buf()), &secrets)
        .expect("Failed to load config from TOML file");

    assert_eq!(config.api_key.as_deref(), Some("toml-key"));
    assert_eq!(config.environment, Environment::Production);
    assert_eq!(config.base_url, "https://kend.example.com");
    assert_eq!(config.envelope, EnvelopeFormat::Flat);
    assert_eq!(config.refresh_driver, RefreshDriver::Timer);
    assert!(config.allow_dev_device_key);
    assert_eq!(config.device.model, "Desktop");
    assert_eq!(config.device.unique_identifier, "device-7");
    assert_eq!(config.close_session_timeout.as_secs(), 2);
}

#[test]
fn test_load_config_from_json_file_with_keychain_secret() {
    let json_content = r#"{ "api_key": "json-key", "signing": "hmac" }"#;

    let mut file = Builder::new().suffix(".json").tempfile().expect("Failed to create temp file");
    file.write_all(json_content.as_bytes()).expect("Failed to write to temp file");

    let secrets = MockKeychainProvider::default();
    secrets.set_secret(config::loader::HMAC_SECRET_ACCOUNT, "keychain-secret").unwrap();

    let config = config::load_from_file(Some(file.path().to_path_buf()), &secrets)
        .expect("Failed to load config from JSON file");

    assert_eq!(config.api_key.as_deref(), Some("json-key"));
    assert!(config.signing.is_hmac());
    if std::env::var(config::loader::ENV_HMAC_SECRET).is_err() {
        assert_eq!(config.signing, SigningMode::Hmac { secret: "keychain-secret".to_string() });
    }
}

#[test]
fn test_file_without_api_key_is_rejected() {
    let mut file = Builder::new().suffix(".toml").tempfile().expect("Failed to create temp file");
    file.write_all(b"environment = \"sandbox\"\n").expect("Failed to write to temp file");

    let secrets = MockKeychainProvider::default();
    let err = config::load_from_file(Some(file.path().to_path_buf()), &secrets).unwrap_err();
    assert!(matches!(err, ElixirError::MissingConfiguration(ref field) if field == "api_key"));
}

#[test]
fn test_malformed_toml_is_rejected() {
    let mut file = Builder::new().suffix(".toml").tempfile().expect("Failed to create temp file");
    file.write_all(b"api_key = [unterminated").expect("Failed to write to temp file");

    let secrets = MockKeychainProvider::default();
    let err = config::load_from_file(Some(file.path().to_path_buf()), &secrets).unwrap_err();
    assert!(matches!(err, ElixirError::MissingConfiguration(ref msg) if msg.contains("TOML")));
}

#[test]
fn test_process_arguments_supply_device_key() {
    let args = ["game.exe", "-batchmode", "-rei", "rei-from-launcher"];
    assert_eq!(
        config::device_key_from_args(args.iter().skip(1)).as_deref(),
        Some("rei-from-launcher")
    );
}
