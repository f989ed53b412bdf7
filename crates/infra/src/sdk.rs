//! SDK facade
//!
//! Wires the reqwest transport, keychain token store and broadcast event
//! channel into a [`SessionManager`] and hands out the feature clients.

use std::sync::Arc;

use elixir_common::{KeychainProvider, SecretStore};
use elixir_core::{
    EventPublisher, HttpTransport, NftClient, ReiClient, SessionManager, TokenStore,
    TournamentClient, UserClient,
};
use elixir_domain::{OverlayEvent, Result, SdkConfig, Session};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::config::{self, device_key_from_process};
use crate::events::BroadcastEventPublisher;
use crate::http::ReqwestTransport;
use crate::storage::KeychainTokenStore;

/// Keychain service under which the SDK keeps its secrets.
pub const KEYCHAIN_SERVICE: &str = "elixir-sdk";

/// Entry point for games embedding the SDK
pub struct ElixirSdk {
    config: SdkConfig,
    session: Arc<SessionManager>,
    events: BroadcastEventPublisher,
}

impl ElixirSdk {
    /// SDK over the real HTTP transport and the OS keychain.
    ///
    /// # Errors
    /// `MissingConfiguration` when the configuration is invalid or the HTTP
    /// client cannot be built.
    pub fn new(config: SdkConfig) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::from_config(&config)?);
        let store = Arc::new(KeychainTokenStore::keychain(KEYCHAIN_SERVICE));
        Self::with_transport(config, transport, store)
    }

    /// SDK over caller-supplied adapters.
    ///
    /// # Errors
    /// `MissingConfiguration` when the configuration is invalid.
    pub fn with_transport(
        config: SdkConfig,
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn TokenStore>,
    ) -> Result<Self> {
        let events = BroadcastEventPublisher::default();
        let session = SessionManager::builder(config.clone(), transport, store)
            .publisher(Arc::new(events.clone()))
            .build()?;

        info!(
            environment = %config.environment,
            envelope = ?config.envelope,
            hmac = config.signing.is_hmac(),
            "Elixir SDK initialised"
        );
        Ok(Self { config, session, events })
    }

    /// Load configuration from `.env`, the environment or a config file,
    /// take the device key from `-rei <value>` when present, and build the
    /// SDK.
    ///
    /// # Errors
    /// `MissingConfiguration` when no usable configuration is found.
    pub fn from_env() -> Result<Self> {
        let secrets: Arc<dyn SecretStore> = Arc::new(KeychainProvider::new(KEYCHAIN_SERVICE));
        let mut config = config::load(secrets.as_ref())?;
        if let Some(key) = device_key_from_process() {
            config.device_key = Some(key);
        }

        let transport = Arc::new(ReqwestTransport::from_config(&config)?);
        let store = Arc::new(KeychainTokenStore::new(secrets));
        Self::with_transport(config, transport, store)
    }

    #[must_use]
    pub const fn config(&self) -> &SdkConfig {
        &self.config
    }

    #[must_use]
    pub fn session(&self) -> Arc<SessionManager> {
        Arc::clone(&self.session)
    }

    #[must_use]
    pub fn user(&self) -> UserClient {
        UserClient::new(self.session())
    }

    #[must_use]
    pub fn nfts(&self) -> NftClient {
        NftClient::new(self.session())
    }

    #[must_use]
    pub fn tournaments(&self) -> TournamentClient {
        TournamentClient::new(self.session())
    }

    #[must_use]
    pub fn rei(&self) -> ReiClient {
        ReiClient::new(self.session.gateway().clone())
    }

    /// Receive overlay events (token grants and relayed host events).
    pub fn subscribe_events(&self) -> broadcast::Receiver<OverlayEvent> {
        self.events.subscribe()
    }

    /// Relay a host event to overlay subscribers.
    ///
    /// # Errors
    /// Never fails for the broadcast channel; kept fallible like the port.
    pub fn publish(&self, event: OverlayEvent) -> Result<()> {
        self.events.publish(event)
    }

    /// Establish a session at launch.
    ///
    /// Logs in with the device key when one is configured (or development
    /// keys are allowed), otherwise resumes from the persisted refresh token.
    ///
    /// # Errors
    /// The failure of the chosen flow.
    pub async fn start(&self) -> Result<Session> {
        if self.session.device_key().is_some() || self.config.allow_dev_device_key {
            self.session.login_with_device_key(None).await
        } else {
            self.session.refresh().await
        }
    }

    /// Close the device-key session within the configured bound.
    ///
    /// Failures and timeouts are logged, never returned: shutdown must not
    /// block process exit.
    pub async fn shutdown(&self) {
        if self.session.device_key().is_none() {
            return;
        }
        let timeout = self.config.close_session_timeout;
        if let Err(err) = self.session.close_session_within(timeout).await {
            warn!(error = %err, "Session close at shutdown failed");
        }
    }
}
