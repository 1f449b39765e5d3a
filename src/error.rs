//! Error types for azmon-rules.
//!
//! Each layer has its own error enum ([`ValidationErrors`],
//! [`ApiError`], [`ResourceError`], [`StateError`]); this module folds
//! them into one [`Error`] for the command-line host, with an exit code per
//! failure class.

use crate::azure::ResourceIdError;
use crate::monitor::client::ApiError;
use crate::provider::ResourceError;
use crate::schema::ValidationErrors;
use crate::state::StateError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for azmon-rules operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for azmon-rules.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Rule Errors
    // ========================================================================
    /// Declared parameters failed schema validation.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// Rule file not found.
    #[error("Rule file not found: {0}")]
    RuleFileNotFound(PathBuf),

    /// Error parsing a rule file.
    #[error("Failed to parse rule file '{path}': {message}")]
    RuleParse {
        /// Path to the rule file
        path: PathBuf,
        /// Error message
        message: String,
        /// Source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Malformed resource identifier.
    #[error("Invalid resource ID: {0}")]
    InvalidId(#[from] ResourceIdError),

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// A lifecycle handler failed.
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Resource Manager call failed outside a handler.
    #[error("Azure API error: {0}")]
    Api(#[from] ApiError),

    /// A force-new field changed and replacement was not requested.
    #[error("'{address}' must be replaced because {fields} changed; rerun with --replace")]
    ReplacementRequired {
        /// Resource address
        address: String,
        /// Comma-separated field names
        fields: String,
    },

    // ========================================================================
    // State Errors
    // ========================================================================
    /// State file error.
    #[error(transparent)]
    State(#[from] StateError),

    /// Address has no entry in the state file.
    #[error("'{0}' is not tracked in the state file")]
    NotTracked(String),

    /// Address already has an entry in the state file.
    #[error("'{address}' is already tracked as '{id}'")]
    AlreadyTracked {
        /// Resource address
        address: String,
        /// Tracked resource id
        id: String,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidConfig {
        /// Configuration key
        key: String,
        /// Error message
        message: String,
    },

    // ========================================================================
    // IO Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ========================================================================
    // Serialization Errors
    // ========================================================================
    /// YAML parsing error.
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ========================================================================
    // Other Errors
    // ========================================================================
    /// Generic error with source.
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
        /// Source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Creates a new rule parse error.
    pub fn rule_parse(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::RuleParse {
            path: path.into(),
            message: message.into(),
            source,
        }
    }

    /// Creates a new invalid config error.
    pub fn invalid_config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Returns true if retrying the same command may succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Resource(ResourceError::Timeout { .. }) => true,
            Error::Resource(ResourceError::Api { source, .. }) | Error::Api(source) => {
                source.is_retryable()
            }
            _ => false,
        }
    }

    /// Returns the error code for CLI exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Resource(ResourceError::Api { source, .. }) | Error::Api(source) => {
                match source {
                    ApiError::Auth { .. } => 3,
                    _ => 2,
                }
            }
            Error::Validation(_)
            | Error::Resource(ResourceError::Validation(_))
            | Error::RuleParse { .. }
            | Error::YamlParse(_)
            | Error::JsonParse(_) => 4,
            Error::InvalidId(_) | Error::Resource(ResourceError::InvalidId(_)) => 4,
            Error::Resource(ResourceError::NotFound { .. })
            | Error::RuleFileNotFound(_)
            | Error::NotTracked(_) => 5,
            Error::Resource(ResourceError::AlreadyExists { .. })
            | Error::AlreadyTracked { .. }
            | Error::ReplacementRequired { .. } => 6,
            Error::Resource(ResourceError::Timeout { .. })
            | Error::Resource(ResourceError::Cancelled { .. }) => 7,
            _ => 1,
        }
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Adds context with a closure that is only evaluated on error.
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Other {
            message: message.into(),
            source: Some(Box::new(e)),
        })
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| Error::Other {
            message: f().into(),
            source: Some(Box::new(e)),
        })
    }
}
