//! Session lifecycle types
//!
//! Wire payloads of the `/sdk/auth/v2` endpoints plus the in-memory
//! [`Session`] owned by the session manager.

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Token pair returned by every login and refresh endpoint
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TokenGrant {
    pub token: String,
    /// Absolute expiry in epoch milliseconds, as reported by the backend.
    pub token_expiry: u64,
    /// Token lifetime in milliseconds.
    #[serde(rename = "tokenLifeMS")]
    pub token_life_ms: u64,
    pub refresh_token: String,
    pub new_account: bool,
}

impl TokenGrant {
    #[must_use]
    pub const fn lifetime(&self) -> Duration {
        Duration::from_millis(self.token_life_ms)
    }
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("token", &"<redacted>")
            .field("token_expiry", &self.token_expiry)
            .field("token_life_ms", &self.token_life_ms)
            .field("refresh_token", &"<redacted>")
            .field("new_account", &self.new_account)
            .finish()
    }
}

/// Authenticated session held by the session manager
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<Instant>,
    pub token_lifetime: Duration,
    pub device_key: Option<String>,
    pub new_account: bool,
}

impl Session {
    /// Build a session from a grant received at `now`.
    #[must_use]
    pub fn from_grant(grant: &TokenGrant, now: Instant, device_key: Option<String>) -> Self {
        let lifetime = grant.lifetime();
        Self {
            access_token: Some(grant.token.clone()).filter(|t| !t.is_empty()),
            refresh_token: Some(grant.refresh_token.clone()).filter(|t| !t.is_empty()),
            expires_at: now.checked_add(lifetime),
            token_lifetime: lifetime,
            device_key,
            new_account: grant.new_account,
        }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    #[must_use]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .field("token_lifetime", &self.token_lifetime)
            .field("device_key", &self.device_key.as_ref().map(|_| "<redacted>"))
            .field("new_account", &self.new_account)
            .finish()
    }
}

/// Session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated,
    Refreshing,
    LoggingOut,
}

impl SessionState {
    /// Whether the lifecycle allows moving from `self` to `next`.
    ///
    /// `Unauthenticated -> Refreshing` covers resuming from a persisted
    /// refresh token in a fresh process. Any state may fall back to
    /// `Unauthenticated`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        use SessionState::{Authenticated, Authenticating, LoggingOut, Refreshing, Unauthenticated};
        matches!(
            (self, next),
            (_, Unauthenticated)
                | (Unauthenticated | Authenticated, Authenticating | Refreshing)
                | (Authenticating | Refreshing, Authenticated)
                | (Authenticated, LoggingOut)
        )
    }

    /// A login or refresh is currently in flight.
    #[must_use]
    pub const fn is_busy(self) -> bool {
        matches!(self, Self::Authenticating | Self::Refreshing)
    }
}

/// Email OTP transaction awaiting confirmation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PendingLoginTransaction {
    pub transaction_id: String,
    pub user_code: String,
}

/// Result of closing a device-key session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloseSessionOutcome {
    pub closed: bool,
}

/// Response body of the signout endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignoutResponse {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseSessionRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpLoginRequest {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpVerifyRequest {
    pub transaction_id: String,
    pub code: String,
    pub device_model: String,
    pub device_unique_identifier: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrVerifyRequest {
    pub qr_value: String,
    pub device_model: String,
    pub device_unique_identifier: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_decodes_backend_field_names() {
        let grant: TokenGrant = serde_json::from_str(
            r#"{"token":"T1","tokenExpiry":1700000000000,"tokenLifeMS":3600000,"refreshToken":"R1","newAccount":true}"#,
        )
        .unwrap();
        assert_eq!(grant.token, "T1");
        assert_eq!(grant.refresh_token, "R1");
        assert_eq!(grant.lifetime(), Duration::from_secs(3600));
        assert!(grant.new_account);
    }

    #[test]
    fn grant_debug_hides_tokens() {
        let grant = TokenGrant { token: "T1".into(), refresh_token: "R1".into(), ..TokenGrant::default() };
        let rendered = format!("{grant:?}");
        assert!(!rendered.contains("T1"));
        assert!(!rendered.contains("R1"));
    }

    #[test]
    fn session_from_grant_sets_expiry() {
        let now = Instant::now();
        let grant = TokenGrant {
            token: "T1".into(),
            refresh_token: "R1".into(),
            token_life_ms: 10_000,
            ..TokenGrant::default()
        };
        let session = Session::from_grant(&grant, now, Some("rei".into()));
        assert!(session.is_authenticated());
        assert_eq!(session.expires_at, Some(now + Duration::from_secs(10)));
        assert!(!session.is_expired_at(now));
        assert!(session.is_expired_at(now + Duration::from_secs(10)));
    }

    #[test]
    fn empty_token_is_not_authenticated() {
        let session = Session::from_grant(&TokenGrant::default(), Instant::now(), None);
        assert!(!session.is_authenticated());
        assert!(session.refresh_token.is_none());
    }

    #[test]
    fn lifecycle_transitions() {
        use SessionState::*;
        assert!(Unauthenticated.can_transition_to(Authenticating));
        assert!(Unauthenticated.can_transition_to(Refreshing));
        assert!(Authenticating.can_transition_to(Authenticated));
        assert!(Authenticated.can_transition_to(Refreshing));
        assert!(Refreshing.can_transition_to(Unauthenticated));
        assert!(Authenticated.can_transition_to(LoggingOut));
        assert!(LoggingOut.can_transition_to(Unauthenticated));

        assert!(!Unauthenticated.can_transition_to(Authenticated));
        assert!(!Unauthenticated.can_transition_to(LoggingOut));
        assert!(!LoggingOut.can_transition_to(Authenticated));
        assert!(!Refreshing.can_transition_to(Authenticating));
    }

    #[test]
    fn verify_requests_use_camel_case() {
        let body = serde_json::to_value(OtpVerifyRequest {
            transaction_id: "tx".into(),
            code: "123456".into(),
            device_model: "model".into(),
            device_unique_identifier: "id".into(),
        })
        .unwrap();
        assert_eq!(body["transactionId"], "tx");
        assert_eq!(body["deviceUniqueIdentifier"], "id");
    }
}
