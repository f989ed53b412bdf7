//! Domain types and models
//!
//! Session lifecycle types, backend payloads and overlay events.

pub mod events;
pub mod nft;
pub mod rei;
pub mod session;
pub mod tournament;
pub mod user;

pub use events::{ChainResults, OverlayEvent};
pub use nft::{Nft, NftAttribute, NftCollection};
pub use rei::DevReiKey;
pub use session::{
    CloseSessionOutcome, CloseSessionRequest, OtpLoginRequest, OtpVerifyRequest,
    PendingLoginTransaction, QrVerifyRequest, RefreshRequest, Session, SessionState,
    SignoutResponse, TokenGrant,
};
pub use tournament::Tournament;
pub use user::UserData;
