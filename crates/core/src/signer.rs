//! Request signing
//!
//! Produces the credential and cache-busting headers for an outbound
//! request. [`RequestSigner::sign_at`] is pure given the method, path, body,
//! bearer, epoch and configured secret; [`RequestSigner::sign`] only adds the
//! current epoch from the injected [`Clock`].

use std::sync::Arc;

use elixir_common::{hmac_sha256_hex, Clock};
use elixir_domain::constants::{
    CACHE_CONTROL_VALUE, CONTENT_TYPE_JSON, EXPIRES_VALUE, HEADER_API_KEY, HEADER_API_SIGNATURE,
    HEADER_API_TIME, HEADER_AUTHORIZATION, HEADER_CACHE_CONTROL, HEADER_CONTENT_TYPE,
    HEADER_EXPIRES,
};
use elixir_domain::{ElixirError, Result, SdkConfig, SigningMode};

use crate::ports::HttpMethod;

/// String signed in HMAC mode.
///
/// `"{epoch}.{body}"` when a body is sent, otherwise `"{epoch}."{path}""`
/// (the path wrapped in double quotes).
#[must_use]
pub fn signing_payload(epoch: u64, path: &str, body: Option<&str>) -> String {
    match body {
        Some(body) => format!("{epoch}.{body}"),
        None => format!("{epoch}.\"{path}\""),
    }
}

/// Attaches credentials to outbound requests
pub struct RequestSigner {
    api_key: Option<String>,
    mode: SigningMode,
    clock: Arc<dyn Clock>,
}

impl RequestSigner {
    pub fn new(api_key: Option<String>, mode: SigningMode, clock: Arc<dyn Clock>) -> Self {
        Self { api_key, mode, clock }
    }

    pub fn from_config(config: &SdkConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(config.api_key.clone(), config.signing.clone(), clock)
    }

    #[must_use]
    pub const fn mode(&self) -> &SigningMode {
        &self.mode
    }

    /// Sign with the current epoch.
    ///
    /// # Errors
    /// `MissingConfiguration` when no API key is configured.
    pub fn sign(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&str>,
        bearer: Option<&str>,
    ) -> Result<Vec<(String, String)>> {
        self.sign_at(method, path, body, bearer, self.clock.unix_seconds())
    }

    /// Sign with an explicit epoch (seconds).
    ///
    /// # Errors
    /// `MissingConfiguration` when no API key is configured.
    pub fn sign_at(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&str>,
        bearer: Option<&str>,
        epoch: u64,
    ) -> Result<Vec<(String, String)>> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ElixirError::MissingConfiguration("api_key".to_string()))?;

        let mut headers = vec![
            (HEADER_CACHE_CONTROL.to_string(), CACHE_CONTROL_VALUE.to_string()),
            (HEADER_EXPIRES.to_string(), EXPIRES_VALUE.to_string()),
            (HEADER_API_KEY.to_string(), api_key.to_string()),
        ];

        if let Some(token) = bearer.filter(|token| !token.is_empty()) {
            headers.push((HEADER_AUTHORIZATION.to_string(), format!("Bearer {token}")));
        }

        if method == HttpMethod::Post {
            headers.push((HEADER_CONTENT_TYPE.to_string(), CONTENT_TYPE_JSON.to_string()));
        }

        if let SigningMode::Hmac { secret } = &self.mode {
            let payload = signing_payload(epoch, path, body);
            let signature = hmac_sha256_hex(secret.as_bytes(), payload.as_bytes())
                .map_err(|e| ElixirError::MissingConfiguration(format!("hmac secret: {e}")))?;
            headers.push((HEADER_API_TIME.to_string(), epoch.to_string()));
            headers.push((HEADER_API_SIGNATURE.to_string(), signature));
        }

        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use elixir_common::MockClock;

    use super::*;

    fn header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
        headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }

    fn hmac_signer(secret: &str) -> RequestSigner {
        RequestSigner::new(
            Some("api-key".into()),
            SigningMode::Hmac { secret: secret.into() },
            Arc::new(MockClock::at_unix_seconds(1_700_000_000)),
        )
    }

    #[test]
    fn payload_uses_body_or_quoted_path() {
        assert_eq!(signing_payload(42, "/x", Some("{\"a\":1}")), "42.{\"a\":1}");
        assert_eq!(signing_payload(42, "/sdk/v2/userinfo", None), "42.\"/sdk/v2/userinfo\"");
    }

    #[test]
    fn bearer_mode_attaches_standard_headers() {
        let signer = RequestSigner::new(
            Some("api-key".into()),
            SigningMode::Bearer,
            Arc::new(MockClock::new()),
        );
        let headers = signer.sign(HttpMethod::Get, "/sdk/v2/userinfo", None, Some("T1")).unwrap();

        assert_eq!(header(&headers, "authorization"), Some("Bearer T1"));
        assert_eq!(header(&headers, "x-api-key"), Some("api-key"));
        assert_eq!(header(&headers, "cache-control"), Some("no-cache, no-store, must-revalidate"));
        assert_eq!(header(&headers, "expires"), Some("0"));
        assert!(header(&headers, "x-api-signature").is_none());
        assert!(header(&headers, "content-type").is_none());
    }

    #[test]
    fn missing_bearer_omits_authorization() {
        let signer = RequestSigner::new(Some("k".into()), SigningMode::Bearer, Arc::new(MockClock::new()));
        let headers = signer.sign(HttpMethod::Post, "/p", Some("{}"), None).unwrap();
        assert!(header(&headers, "authorization").is_none());
        assert_eq!(header(&headers, "content-type"), Some("application/json"));
    }

    #[test]
    fn missing_api_key_is_configuration_error() {
        let signer = RequestSigner::new(None, SigningMode::Bearer, Arc::new(MockClock::new()));
        let err = signer.sign(HttpMethod::Get, "/p", None, None).unwrap_err();
        assert!(matches!(err, ElixirError::MissingConfiguration(_)));
    }

    #[test]
    fn hmac_signature_is_deterministic() {
        let signer = hmac_signer("s3cret");
        let a = signer.sign_at(HttpMethod::Post, "/p", Some("{\"x\":1}"), None, 100).unwrap();
        let b = signer.sign_at(HttpMethod::Post, "/p", Some("{\"x\":1}"), None, 100).unwrap();
        assert_eq!(a, b);
        assert_eq!(header(&a, "x-api-time"), Some("100"));

        let expected = hmac_sha256_hex(b"s3cret", b"100.{\"x\":1}").unwrap();
        assert_eq!(header(&a, "x-api-signature"), Some(expected.as_str()));
    }

    #[test]
    fn hmac_signature_changes_with_any_input() {
        let signer = hmac_signer("s3cret");
        let sig = |signer: &RequestSigner, path: &str, body: Option<&str>, epoch: u64| {
            let headers = signer.sign_at(HttpMethod::Post, path, body, None, epoch).unwrap();
            header(&headers, "x-api-signature").unwrap().to_string()
        };

        let base = sig(&signer, "/p", Some("{\"x\":1}"), 100);
        assert_ne!(base, sig(&signer, "/p", Some("{\"x\":2}"), 100));
        assert_ne!(base, sig(&signer, "/p", Some("{\"x\":1}"), 101));
        assert_ne!(base, sig(&hmac_signer("s3creT"), "/p", Some("{\"x\":1}"), 100));
        assert_ne!(sig(&signer, "/a", None, 100), sig(&signer, "/b", None, 100));
    }

    #[test]
    fn sign_reads_epoch_from_clock() {
        let headers = hmac_signer("s").sign(HttpMethod::Get, "/p", None, None).unwrap();
        assert_eq!(header(&headers, "x-api-time"), Some("1700000000"));
    }
}
