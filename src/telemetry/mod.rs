//! Logging for the CLI host.
//!
//! Library code only emits `tracing` events; installing a subscriber is the
//! binary's job:
//!
//! ```rust,ignore
//! use azmon_rules::telemetry::{init_logging, LoggingConfig};
//!
//! init_logging(LoggingConfig::default().with_verbosity(2))?;
//! tracing::info!(rule = %name, "Creating scheduled query rule");
//! ```

pub mod config;
pub mod logging;

pub use config::{LogFormat, LogLevel, LoggingConfig};
pub use logging::LoggingBuilder;

/// Install the global subscriber for `config`.
pub fn init_logging(config: LoggingConfig) -> crate::error::Result<()> {
    LoggingBuilder::from_config(config).init()
}
