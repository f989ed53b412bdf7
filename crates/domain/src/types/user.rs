//! User profile payload

use serde::{Deserialize, Serialize};

/// Profile returned by `/sdk/v2/userinfo`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserData {
    pub elixir_id: String,
    pub nickname: String,
    pub avatar: String,
    pub wallet: String,
}

impl UserData {
    #[must_use]
    pub fn has_wallet(&self) -> bool {
        !self.wallet.trim().is_empty()
    }
}
