//! Tracing subscriber initialisation
//!
//! Filtering comes from `ELIXIR_LOG` (same syntax as `RUST_LOG`), falling
//! back to `info`. `ELIXIR_LOG_FORMAT=json` switches to JSON lines.

use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub const ENV_LOG: &str = "ELIXIR_LOG";
pub const ENV_LOG_FORMAT: &str = "ELIXIR_LOG_FORMAT";

/// Output format of the fmt layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    /// Read `ELIXIR_LOG_FORMAT`; anything but `json` means pretty.
    pub fn from_env() -> Self {
        Self::parse(std::env::var(ENV_LOG_FORMAT).ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Install the global subscriber.
///
/// Returns `false` when a subscriber was already installed, which is not an
/// error for embedders that configure tracing themselves.
pub fn init(format: LogFormat) -> bool {
    let filter = EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_target(true);

    let installed = match format {
        LogFormat::Pretty => builder.finish().try_init(),
        LogFormat::Json => builder.json().finish().try_init(),
    };
    installed.is_ok()
}
