//! Time utilities and abstractions
//!
//! - **Clock abstractions**: real and mock time so that request signing and
//!   session expiry can be tested deterministically.
//!
//! ## Usage
//!
//! ```rust
//! use std::time::Duration;
//!
//! use elixir_common::time::{Clock, MockClock};
//!
//! let clock = MockClock::at_unix_seconds(1_700_000_000);
//! clock.advance(Duration::from_secs(5));
//! assert_eq!(clock.unix_seconds(), 1_700_000_005);
//! ```

pub mod clock;

pub use clock::{Clock, MockClock, SystemClock};
