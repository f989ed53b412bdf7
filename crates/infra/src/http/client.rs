use std::time::Duration;

use async_trait::async_trait;
use elixir_core::{HttpMethod, HttpTransport, OutboundRequest, RawResponse, TransportFailure};
use elixir_domain::{ElixirError, SdkConfig};
use reqwest::{Client as ReqwestClient, Method};
use tracing::debug;

use crate::errors::{transport_failure, InfraError};

/// reqwest-backed [`HttpTransport`] with timeout and transport-level retries.
///
/// Every HTTP status is handed back as a [`RawResponse`]; only requests that
/// produced no response at all are retried.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: ReqwestClient,
    max_attempts: usize,
    base_backoff: Duration,
}

impl ReqwestTransport {
    /// Start building a new transport.
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self, ElixirError> {
        Self::builder().build()
    }

    /// Transport tuned from the SDK configuration.
    pub fn from_config(config: &SdkConfig) -> Result<Self, ElixirError> {
        Self::builder()
            .timeout(config.request_timeout)
            .max_attempts(usize::try_from(config.transport_attempts).unwrap_or(1))
            .user_agent(format!("elixir-sdk-rust/{}", env!("CARGO_PKG_VERSION")))
            .build()
    }

    fn backoff_delay(&self, retry_number: usize) -> Duration {
        let shift = u32::try_from(retry_number.saturating_sub(1).min(8)).unwrap_or(8);
        let multiplier = 1u32 << shift;
        self.base_backoff.saturating_mul(multiplier)
    }

    async fn sleep_with_backoff(&self, retry_number: usize) {
        let delay = self.backoff_delay(retry_number);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: OutboundRequest) -> Result<RawResponse, TransportFailure> {
        let attempts = self.max_attempts.max(1);
        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
        };

        for attempt in 0..attempts {
            let mut builder = self.client.request(method.clone(), &request.url);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if let Some(body) = &request.body {
                builder = builder.body(body.clone());
            }

            debug!(attempt = attempt + 1, %method, path = %request.path, "sending HTTP request");

            match builder.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    debug!(attempt = attempt + 1, %method, path = %request.path, status, "received HTTP response");

                    return match response.text().await {
                        Ok(body) => Ok(RawResponse::new(status, body)),
                        Err(err) => Err(transport_failure(&err)),
                    };
                }
                Err(err) => {
                    debug!(attempt = attempt + 1, %method, path = %request.path, error = %err, "HTTP request failed");

                    if attempt + 1 < attempts && should_retry_error(&err) {
                        self.sleep_with_backoff(attempt + 1).await;
                        continue;
                    }

                    return Err(transport_failure(&err));
                }
            }
        }

        Err(TransportFailure::new("http transport exhausted retries without producing a result"))
    }
}

/// Builder for [`ReqwestTransport`].
#[derive(Debug)]
pub struct ReqwestTransportBuilder {
    timeout: Duration,
    max_attempts: usize,
    base_backoff: Duration,
    user_agent: Option<String>,
}

impl Default for ReqwestTransportBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_attempts: 1,
            base_backoff: Duration::from_millis(200),
            user_agent: None,
        }
    }
}

impl ReqwestTransportBuilder {
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configure the total number of attempts (initial try + retries).
    #[must_use]
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    #[must_use]
    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> Result<ReqwestTransport, ElixirError> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        let client = builder.build().map_err(|err| ElixirError::from(InfraError::from(err)))?;

        Ok(ReqwestTransport {
            client,
            max_attempts: self.max_attempts.max(1),
            base_backoff: self.base_backoff,
        })
    }
}

fn should_retry_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn request(method: HttpMethod, url: String, path: &str, body: Option<&str>) -> OutboundRequest {
        OutboundRequest {
            method,
            url,
            path: path.to_string(),
            headers: vec![
                ("x-api-key".to_string(), "key-123".to_string()),
                ("Authorization".to_string(), "Bearer abc".to_string()),
            ],
            body: body.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn forwards_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sdk/auth/v2/session/refresh"))
            .and(header("x-api-key", "key-123"))
            .and(header("Authorization", "Bearer abc"))
            .and(body_string("{\"refreshToken\":\"r1\"}"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"data\":{}}"))
            .expect(1)
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new().expect("transport");
        let url = format!("{}/sdk/auth/v2/session/refresh", server.uri());
        let response = transport
            .execute(request(
                HttpMethod::Post,
                url,
                "/sdk/auth/v2/session/refresh",
                Some("{\"refreshToken\":\"r1\"}"),
            ))
            .await
            .expect("response");

        assert_eq!(response, RawResponse::new(200, "{\"data\":{}}"));
    }

    #[tokio::test]
    async fn error_statuses_are_returned_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .expect(1)
            .mount(&server)
            .await;

        let transport = ReqwestTransport::builder()
            .max_attempts(3)
            .base_backoff(Duration::from_millis(5))
            .build()
            .expect("transport");
        let response = transport
            .execute(request(HttpMethod::Get, server.uri(), "/", None))
            .await
            .expect("response");

        assert_eq!(response.status, 503);
        assert_eq!(response.body, "down");
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn network_failure_is_a_transport_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = ReqwestTransport::builder()
            .base_backoff(Duration::from_millis(5))
            .max_attempts(2)
            .build()
            .expect("transport");

        let err = transport
            .execute(request(HttpMethod::Get, format!("http://{addr}"), "/", None))
            .await
            .unwrap_err();
        assert!(err.message.to_lowercase().contains("http"));
    }

    #[tokio::test]
    async fn request_timeout_is_enforced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let transport =
            ReqwestTransport::builder().timeout(Duration::from_millis(50)).build().expect("transport");
        let err = transport
            .execute(request(HttpMethod::Get, server.uri(), "/", None))
            .await
            .unwrap_err();
        assert!(err.message.contains("timeout"));
    }

    #[test]
    fn backoff_doubles_per_retry() {
        let transport = ReqwestTransport::builder()
            .base_backoff(Duration::from_millis(10))
            .build()
            .expect("transport");
        assert_eq!(transport.backoff_delay(1), Duration::from_millis(10));
        assert_eq!(transport.backoff_delay(3), Duration::from_millis(40));
    }
}
