//! SDK constants
//!
//! Endpoint paths, header names and the timing contracts of the session
//! lifecycle.

use std::time::Duration;

// Backend
pub const DEFAULT_BASE_URL: &str = "https://kend.elixir.app";

// Auth endpoints
pub const DEV_REIKEY_PATH: &str = "/sdk/auth/v2/dev/reikey";
pub const SESSION_REIKEY_PATH: &str = "/sdk/auth/v2/session/reikey";
pub const SESSION_REFRESH_PATH: &str = "/sdk/auth/v2/session/refresh";
pub const SESSION_CLOSEREI_PATH: &str = "/sdk/auth/v2/session/closerei";
pub const SESSION_SIGNOUT_PATH: &str = "/sdk/auth/v2/session/signout";
pub const OTP_LOGIN_PATH: &str = "/sdk/auth/v2/signin/otp-login";
pub const OTP_VERIFY_PATH: &str = "/sdk/auth/v2/signin/otp-verify";
pub const QR_VERIFY_PATH: &str = "/sdk/auth/v2/signin/qr-verify";

// Feature endpoints
pub const USER_INFO_PATH: &str = "/sdk/v2/userinfo";
pub const USER_NFTS_PATH: &str = "/sdk/v2/nfts/user";
pub const TOURNAMENTS_PATH: &str = "/sdk/v2/tournaments/";

// Headers
pub const HEADER_AUTHORIZATION: &str = "Authorization";
pub const HEADER_API_KEY: &str = "x-api-key";
pub const HEADER_API_TIME: &str = "x-api-time";
pub const HEADER_API_SIGNATURE: &str = "x-api-signature";
pub const HEADER_CACHE_CONTROL: &str = "Cache-Control";
pub const HEADER_EXPIRES: &str = "Expires";
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const CACHE_CONTROL_VALUE: &str = "no-cache, no-store, must-revalidate";
pub const EXPIRES_VALUE: &str = "0";
pub const CONTENT_TYPE_JSON: &str = "application/json";

// Persistence
pub const REFRESH_TOKEN_KEY_PREFIX: &str = "Elixir.RefreshToken";

// QR handoff
pub const QR_PAYLOAD_PREFIX: &str = "REIKEY:";

// Error codes
pub const UNSPECIFIED_ERROR_CODE: i32 = -1;
pub const NO_WALLET_CODE: i32 = -2000;

// Timing
pub const REFRESH_MARGIN: Duration = Duration::from_secs(5);
pub const NEW_ACCOUNT_GRACE: Duration = Duration::from_secs(2);
pub const CLOSE_SESSION_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
