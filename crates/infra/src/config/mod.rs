//! Configuration loading
//!
//! Resolves an [`elixir_domain::SdkConfig`] from environment variables,
//! `.env` files, TOML/JSON config files and process arguments.

pub mod args;
pub mod loader;

// Re-export commonly used items
pub use args::{device_key_from_args, device_key_from_process};
pub use loader::{
    load, load_from_env, load_from_file, load_from_lookup, probe_config_paths, ConfigFile,
};
