//! Development device-key provisioning

use elixir_domain::constants::DEV_REIKEY_PATH;
use elixir_domain::{DevReiKey, ElixirError, Result};

use crate::gateway::ApiGateway;

/// Issues device keys for development builds. Needs no session.
pub struct ReiClient {
    gateway: ApiGateway,
}

impl ReiClient {
    pub fn new(gateway: ApiGateway) -> Self {
        Self { gateway }
    }

    /// # Errors
    /// `Decode` when the backend returns no key, otherwise the classified
    /// failure.
    pub async fn development_key(&self) -> Result<DevReiKey> {
        let key: DevReiKey = self.gateway.get(DEV_REIKEY_PATH, None).await?;
        if key.reikey.is_empty() {
            return Err(ElixirError::Decode("development device key missing".to_string()));
        }
        Ok(key)
    }
}
