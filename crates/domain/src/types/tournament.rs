//! Tournament listing payload

use serde::{Deserialize, Serialize};

/// Tournament as listed by `/sdk/v2/tournaments/`. The backend sends every
/// field as an optional string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Tournament {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    pub name: Option<String>,
    pub game_id: Option<String>,
    pub description: Option<String>,
    pub created_at: Option<String>,
    pub modified_at: Option<String>,
    pub starts_at: Option<String>,
    pub ends_at: Option<String>,
    pub repeat_every: Option<String>,
    pub location: Option<String>,
    pub event_url: Option<String>,
    pub user_id: Option<String>,
    pub image_url: Option<String>,
    pub prize_pool: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub visibility: Option<String>,
    pub rules: Option<String>,
    pub prize_description: Option<String>,
    pub settings_id: Option<String>,
    pub leaderboard: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_renamed_fields() {
        let t: Tournament =
            serde_json::from_str(r#"{"_id":"t1","type":"weekly","prizePool":"100"}"#).unwrap();
        assert_eq!(t.id.as_deref(), Some("t1"));
        assert_eq!(t.kind.as_deref(), Some("weekly"));
        assert_eq!(t.prize_pool.as_deref(), Some("100"));
        assert!(t.rules.is_none());
    }
}
