//! End-to-end tests of the SDK facade against a mock backend
//!
//! Exercises the real reqwest transport, the keychain token store (over an
//! in-memory secret store) and the session manager together.

use std::sync::Arc;
use std::time::{Duration, Instant};

use elixir_common::testing::MockKeychainProvider;
use elixir_common::{hmac_sha256_hex, SecretStore};
use elixir_domain::{ElixirError, Environment, OverlayEvent, SdkConfig, SigningMode};
use elixir_infra::{ElixirSdk, KeychainTokenStore, ReqwestTransport};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REFRESH_KEY: &str = "Elixir.RefreshToken.sandbox";

fn grant_body(token: &str, refresh: &str) -> String {
    format!(
        r#"{{"code":0,"success":true,"data":{{"token":"{token}","tokenLifeMS":3600000,"refreshToken":"{refresh}","newAccount":false}}}}"#
    )
}

fn sdk(config: SdkConfig, secrets: &MockKeychainProvider) -> ElixirSdk {
    let transport = Arc::new(ReqwestTransport::new().expect("transport"));
    let store = Arc::new(KeychainTokenStore::new(Arc::new(secrets.clone())));
    ElixirSdk::with_transport(config, transport, store).expect("sdk")
}

fn config_for(server: &MockServer) -> SdkConfig {
    SdkConfig::new("key-1", Environment::Sandbox).with_base_url(server.uri())
}

#[tokio::test]
async fn device_key_login_then_user_info() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sdk/auth/v2/session/reikey/rei-1"))
        .and(header("x-api-key", "key-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(grant_body("T1", "R1")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sdk/v2/userinfo"))
        .and(header("Authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"code":0,"success":true,"data":{"elixirId":"E1","nickname":"neo","wallet":"0xabc"}}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let secrets = MockKeychainProvider::default();
    let sdk = sdk(config_for(&server).with_device_key("rei-1"), &secrets);
    let mut events = sdk.subscribe_events();

    let session = sdk.start().await.expect("login");
    assert_eq!(session.access_token.as_deref(), Some("T1"));
    assert_eq!(secrets.get_secret(REFRESH_KEY).unwrap(), "R1");
    assert_eq!(events.recv().await.unwrap(), OverlayEvent::Token { token: "T1".to_string() });

    let user = sdk.user().user_info().await.expect("user info");
    assert_eq!(user.elixir_id, "E1");
    assert!(user.has_wallet());
}

#[tokio::test]
async fn start_without_device_key_resumes_from_stored_refresh_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sdk/auth/v2/session/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_string(grant_body("T2", "R2")))
        .expect(1)
        .mount(&server)
        .await;

    let secrets = MockKeychainProvider::default();
    secrets.set_secret(REFRESH_KEY, "R1").unwrap();
    let sdk = sdk(config_for(&server), &secrets);

    let session = sdk.start().await.expect("refresh");
    assert_eq!(session.access_token.as_deref(), Some("T2"));
    assert_eq!(secrets.get_secret(REFRESH_KEY).unwrap(), "R2");

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["refreshToken"], "R1");
}

#[tokio::test]
async fn rejected_refresh_clears_the_stored_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sdk/auth/v2/session/refresh"))
        .respond_with(ResponseTemplate::new(401).set_body_string(
            r#"{"code":401,"success":false,"error":{"code":1003,"message":"expired"}}"#,
        ))
        .mount(&server)
        .await;

    let secrets = MockKeychainProvider::default();
    secrets.set_secret(REFRESH_KEY, "stale").unwrap();
    let sdk = sdk(config_for(&server), &secrets);

    let err = sdk.start().await.unwrap_err();
    assert!(err.requires_login(), "unexpected error {err:?}");
    assert!(matches!(err, ElixirError::InvalidRefreshToken(ref api) if api.http_status == 401));
    assert!(!secrets.secret_exists(REFRESH_KEY));
    assert!(!sdk.session().is_authenticated());
}

#[tokio::test]
async fn backend_rejection_surfaces_domain_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sdk/auth/v2/session/reikey/rei-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"code":0,"success":false,"error":{"code":4012,"message":"unknown rei"}}"#,
        ))
        .mount(&server)
        .await;

    let secrets = MockKeychainProvider::default();
    let sdk = sdk(config_for(&server).with_device_key("rei-1"), &secrets);

    let err = sdk.start().await.unwrap_err();
    let api = err.api_error();
    assert!(matches!(err, ElixirError::BackendRejected(_)));
    assert_eq!(api.domain_code, 4012);
    assert_eq!(api.message, "unknown rei");
}

#[tokio::test]
async fn hmac_mode_signs_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sdk/auth/v2/session/reikey/rei-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(grant_body("T1", "R1")))
        .mount(&server)
        .await;

    let secrets = MockKeychainProvider::default();
    let config = config_for(&server)
        .with_device_key("rei-1")
        .with_signing(SigningMode::Hmac { secret: "s3cret".to_string() });
    let sdk = sdk(config, &secrets);
    sdk.start().await.expect("login");

    let requests = server.received_requests().await.unwrap();
    let request = &requests[0];
    let epoch = request.headers.get("x-api-time").unwrap().to_str().unwrap();
    let signature = request.headers.get("x-api-signature").unwrap().to_str().unwrap();

    let payload = format!("{epoch}.\"/sdk/auth/v2/session/reikey/rei-1\"");
    let expected = hmac_sha256_hex(b"s3cret", payload.as_bytes()).unwrap();
    assert_eq!(signature, expected);
}

#[tokio::test]
async fn shutdown_is_bounded_by_close_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sdk/auth/v2/session/reikey/rei-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(grant_body("T1", "R1")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sdk/auth/v2/session/closerei/rei-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"code":0,"success":true,"data":{"closed":true}}"#)
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let secrets = MockKeychainProvider::default();
    let mut config = config_for(&server).with_device_key("rei-1");
    config.close_session_timeout = Duration::from_millis(200);
    let sdk = sdk(config, &secrets);
    sdk.start().await.expect("login");

    let started = Instant::now();
    sdk.shutdown().await;
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn close_session_reports_backend_answer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sdk/auth/v2/session/reikey/rei-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(grant_body("T1", "R1")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sdk/auth/v2/session/closerei/rei-1"))
        .and(header("Authorization", "Bearer T1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"code":0,"success":true,"data":{"closed":true}}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let secrets = MockKeychainProvider::default();
    let sdk = sdk(config_for(&server).with_device_key("rei-1"), &secrets);
    sdk.start().await.expect("login");

    let outcome = sdk.session().close_session().await.expect("close");
    assert!(outcome.closed);
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let secrets = MockKeychainProvider::default();
    let config = SdkConfig::new("key-1", Environment::Sandbox)
        .with_base_url(format!("http://{addr}"))
        .with_device_key("rei-1");
    let sdk = sdk(config, &secrets);

    let err = sdk.start().await.unwrap_err();
    assert!(matches!(err, ElixirError::Transport(ref api) if api.http_status == 0));
}
