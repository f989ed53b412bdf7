//! Session lifecycle
//!
//! - [`SessionManager`]: login, refresh, logout and close flows
//! - [`QrHandoff`]: single-slot exchange between a QR scanner and the manager

pub mod handoff;
pub mod manager;

pub use handoff::{HandoffClaim, QrHandoff};
pub use manager::{SessionManager, SessionManagerBuilder};
