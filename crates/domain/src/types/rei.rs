//! Development device-key provisioning payload

use serde::{Deserialize, Serialize};

/// Device key issued by `/sdk/auth/v2/dev/reikey` for development builds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DevReiKey {
    pub reikey: String,
    pub player_id: String,
}
