//! Feature clients on top of the authenticated pipeline
//!
//! Every call except development key provisioning needs a session and fails
//! fast with `NotAuthenticated` without one.

pub mod nfts;
pub mod rei;
pub mod tournaments;
pub mod user;

pub use nfts::NftClient;
pub use rei::ReiClient;
pub use tournaments::TournamentClient;
pub use user::UserClient;
