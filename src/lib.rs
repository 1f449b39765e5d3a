//! # azmon-rules
//!
//! Declarative management of Azure Monitor scheduled query rules
//! (`Microsoft.Insights/scheduledQueryRules`): log search alerts and
//! log-to-metric rules.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                           CLI host                                   │
//! │          (rule files, state file, clap-based commands)               │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                    │
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                  provider::Resource lifecycle                        │
//! │      (create / read / update / delete / import under timeouts)       │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                    │
//!          ┌─────────────────────────┼─────────────────────────┐
//!          ▼                         ▼                         ▼
//! ┌─────────────────┐   ┌─────────────────────┐   ┌─────────────────────┐
//! │     schema      │   │  expand / flatten   │   │  REST client (ARM)  │
//! │ (field table +  │   │ (RuleConfig <-> wire│   │ (retries, error     │
//! │   validators)   │   │      model)         │   │    mapping)         │
//! └─────────────────┘   └─────────────────────┘   └─────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use azmon_rules::prelude::*;
//!
//! let config = Config::load(None)?;
//! let client = Arc::new(ScheduledQueryRulesClient::new(&config.azure)?);
//! let resource = ScheduledQueryRulesResource::new(client).with_timeouts(config.timeouts);
//!
//! let mut data = ResourceData::new(params);
//! resource.create(&mut data, &ProviderContext::new(config.features)).await?;
//! println!("created {}", data.id().unwrap_or_default());
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::monitor::{
        InMemoryRulesApi, RuleConfig, RuleId, RuleState, ScheduledQueryRulesApi,
        ScheduledQueryRulesClient, ScheduledQueryRulesDataSource, ScheduledQueryRulesResource,
    };
    pub use crate::provider::{
        ProviderContext, ProviderFeatures, Resource, ResourceData, ResourceError,
        ResourceRegistry, ResourceTimeouts,
    };
    pub use crate::schema::ResourceParams;
    pub use crate::state::StateManager;
    pub use std::sync::Arc;
}

// ============================================================================
// Core Modules
// ============================================================================

/// Error types and result aliases.
pub mod error;

/// Configuration loading and merging.
pub mod config;

/// Structured logging setup.
pub mod telemetry;

// ============================================================================
// Resource Model
// ============================================================================

/// Declarative field schemas and validation.
pub mod schema;

/// Azure identifiers, locations and shared validators.
pub mod azure;

/// Host contract for resource implementations.
pub mod provider;

/// The scheduled query rule resource.
pub mod monitor;

// ============================================================================
// Persistence
// ============================================================================

/// Address to id tracking between runs.
pub mod state;

pub use error::{Error, Result};

// ============================================================================
// Version Information
// ============================================================================

/// Returns the current version of azmon-rules.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
