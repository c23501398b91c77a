//! Logging configuration and initialization
//!
//! Diagnostics go through the `tracing` ecosystem and are written to stderr,
//! leaving stdout to the benchmark console output.
//!
//! # Environment Variables
//!
//! - `TOKBENCH_LOG`: tracing filter (e.g. "info", "debug,tokbench=trace"), falls back to `RUST_LOG`
//! - `TOKBENCH_LOG_FORMAT`: output format ("human" or "json")

use std::str::FromStr;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when no environment variable is set
const DEFAULT_LOG_FILTER: &str = "info";

/// Environment variable for the log filter
pub const LOG_FILTER_ENV: &str = "TOKBENCH_LOG";

/// Environment variable for the log format
pub const LOG_FORMAT_ENV: &str = "TOKBENCH_LOG_FORMAT";

/// Log format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable colored output (default)
    #[default]
    Human,
    /// JSON structured output
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" | "text" => Ok(LogFormat::Human),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("invalid log format: {other}")),
        }
    }
}

impl LogFormat {
    /// Format from `TOKBENCH_LOG_FORMAT`, `None` when unset or invalid
    pub fn from_env() -> Option<Self> {
        std::env::var(LOG_FORMAT_ENV).ok().and_then(|v| v.parse().ok())
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_FILTER_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Installs the global subscriber.
///
/// Returns `false` if a subscriber was already installed, in which case the
/// existing one is kept.
pub fn init_logging(format: LogFormat) -> bool {
    let registry = tracing_subscriber::registry().with(env_filter());
    match format {
        LogFormat::Human => registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init()
            .is_ok(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .is_ok(),
    }
}
