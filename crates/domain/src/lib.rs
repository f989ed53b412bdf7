//! # Elixir Domain
//!
//! Domain types shared by every Elixir SDK crate.
//!
//! This crate contains:
//! - Session, token grant and feature payload types
//! - The SDK error taxonomy and Result alias
//! - Configuration structures
//! - Endpoint paths, header names and timing constants
//!
//! ## Architecture
//! - No dependencies on other Elixir crates
//! - No I/O, no async runtime
//! - Pure data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
