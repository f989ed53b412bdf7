//! Authenticated request pipeline
//!
//! signer → transport → classifier. The gateway is cheap to clone and holds
//! no session state: callers pass the bearer they want attached.

use std::sync::Arc;

use elixir_common::Clock;
use elixir_domain::constants::{SESSION_CLOSEREI_PATH, SESSION_REIKEY_PATH};
use elixir_domain::{Result, SdkConfig};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::classifier::{ExchangeKind, ResponseClassifier};
use crate::ports::{HttpMethod, HttpTransport, OutboundRequest};
use crate::signer::RequestSigner;

/// Signed access to the Elixir backend
#[derive(Clone)]
pub struct ApiGateway {
    base_url: Arc<str>,
    transport: Arc<dyn HttpTransport>,
    signer: Arc<RequestSigner>,
    classifier: Arc<ResponseClassifier>,
}

impl ApiGateway {
    pub fn new(
        base_url: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
        signer: RequestSigner,
        classifier: ResponseClassifier,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: Arc::from(base_url.trim_end_matches('/')),
            transport,
            signer: Arc::new(signer),
            classifier: Arc::new(classifier),
        }
    }

    pub fn from_config(
        config: &SdkConfig,
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::new(
            config.base_url.clone(),
            transport,
            RequestSigner::from_config(config, clock),
            ResponseClassifier::new(config.envelope),
        )
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// `GET path`.
    ///
    /// # Errors
    /// Any classified failure of the exchange.
    pub async fn get<T>(&self, path: &str, bearer: Option<&str>) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        self.send(HttpMethod::Get, path, None, bearer, ExchangeKind::Standard).await
    }

    /// `POST path` with a JSON body.
    ///
    /// # Errors
    /// Any classified failure of the exchange.
    pub async fn post<B, T>(&self, path: &str, body: &B, bearer: Option<&str>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned + Default,
    {
        self.post_as(ExchangeKind::Standard, path, body, bearer).await
    }

    /// `POST path` with an empty JSON object as body.
    ///
    /// # Errors
    /// Any classified failure of the exchange.
    pub async fn post_empty<T>(&self, path: &str, bearer: Option<&str>) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        self.send(HttpMethod::Post, path, None, bearer, ExchangeKind::Standard).await
    }

    /// `POST path`, classified as the given exchange kind.
    ///
    /// # Errors
    /// Any classified failure of the exchange.
    pub async fn post_as<B, T>(
        &self,
        kind: ExchangeKind,
        path: &str,
        body: &B,
        bearer: Option<&str>,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned + Default,
    {
        let body = serde_json::to_string(body)?;
        self.send(HttpMethod::Post, path, Some(body), bearer, kind).await
    }

    async fn send<T>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<String>,
        bearer: Option<&str>,
        kind: ExchangeKind,
    ) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        let body = match method {
            HttpMethod::Get => None,
            HttpMethod::Post => Some(body.unwrap_or_else(|| "{}".to_string())),
        };
        let headers = self.signer.sign(method, path, body.as_deref(), bearer)?;
        let request = OutboundRequest {
            method,
            url: self.url_for(path),
            path: path.to_string(),
            headers,
            body,
        };

        let route = loggable_route(path);
        debug!(%method, route, "Sending Elixir request");

        let outcome = self.transport.execute(request).await;
        match &outcome {
            Ok(response) => debug!(%method, route, status = response.status, "Elixir response"),
            Err(failure) => warn!(%method, route, error = %failure, "Elixir request failed"),
        }

        self.classifier.classify(outcome, kind)
    }
}

/// Path without the device key segment of keyed endpoints.
fn loggable_route(path: &str) -> &str {
    [SESSION_REIKEY_PATH, SESSION_CLOSEREI_PATH]
        .into_iter()
        .find(|prefix| path.starts_with(prefix))
        .unwrap_or(path)
}
