//! Structured logging on top of `tracing-subscriber`.
//!
//! Events go to stderr so that command output on stdout stays machine
//! readable in JSON mode.

use super::config::{LogFormat, LogLevel, LoggingConfig};
use crate::error::{Error, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Builder for the global logging subscriber.
pub struct LoggingBuilder {
    config: LoggingConfig,
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self {
            config: LoggingConfig::default(),
        }
    }

    /// Create a builder from an existing configuration.
    pub fn from_config(config: LoggingConfig) -> Self {
        Self { config }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn with_ansi(mut self, enabled: bool) -> Self {
        self.config.ansi_colors = enabled;
        self
    }

    /// Set filter directive.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.config.filter = Some(filter.into());
        self
    }

    /// `RUST_LOG` wins, then the configured directive, then the level.
    pub fn build_filter(&self) -> EnvFilter {
        let default_filter = self.config.level.to_string();

        if let Some(ref filter) = self.config.filter {
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(filter))
                .unwrap_or_else(|_| EnvFilter::new(&default_filter))
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter))
        }
    }

    /// Install the global subscriber. Fails if one is already set.
    pub fn init(self) -> Result<()> {
        let env_filter = self.build_filter();
        let config = self.config;

        let result = match config.format {
            LogFormat::Pretty => tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_writer(std::io::stderr)
                        .with_ansi(config.ansi_colors)
                        .with_target(config.with_target)
                        .with_file(config.with_file)
                        .with_line_number(config.with_file),
                )
                .try_init(),
            LogFormat::Compact => tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_writer(std::io::stderr)
                        .with_ansi(config.ansi_colors)
                        .with_target(config.with_target)
                        .with_file(config.with_file)
                        .with_line_number(config.with_file),
                )
                .try_init(),
            LogFormat::Json => tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_target(config.with_target)
                        .with_file(config.with_file)
                        .with_line_number(config.with_file),
                )
                .try_init(),
        };

        result.map_err(|e| Error::Config(format!("failed to initialise logging: {}", e)))
    }
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self::new()
    }
}
