//! Azure Monitor scheduled query rules.
//!
//! Manages `Microsoft.Insights/scheduledQueryRules` objects, both variants:
//!
//! - **LogToMetric**: turns log query results into a metric with dimensions
//! - **Alerting**: runs a query on a schedule and notifies action groups
//!   when the trigger condition holds
//!
//! ## Parameters
//!
//! | Parameter | Required | Description |
//! |-----------|----------|-------------|
//! | `name` | Yes | Rule name (forces replacement) |
//! | `resource_group_name` | Yes | Resource group (forces replacement) |
//! | `location` | Yes | Azure region (forces replacement) |
//! | `action_type` | No | `LogToMetric` (default) or `Alerting` (forces replacement) |
//! | `data_source_id` | Yes | Resource the query runs against |
//! | `authorized_resources` | No | Additional resources the query may read |
//! | `criteria` | LogToMetric | Metric name and dimensions |
//! | `query` | No | Log search query |
//! | `query_type` | No | `ResultCount` (default) |
//! | `frequency` | No | Minutes between runs (5-1440) |
//! | `time_window` | No | Minutes of data per run (5-2880) |
//! | `severity` | No | 0-4, Alerting only |
//! | `throttling` | No | Minutes to suppress repeat alerts (0-10000), Alerting only |
//! | `azns_action` | No | Action groups, email subject, webhook payload; Alerting only |
//! | `trigger` | Alerting | Threshold condition with optional metric trigger |
//! | `enabled` | No | Default `true` |
//! | `description` | No | Free text |
//! | `tags` | No | Resource tags |
//!
//! ## Example
//!
//! ```yaml
//! name: cpu-alert
//! resource_group_name: monitoring
//! location: West Europe
//! action_type: Alerting
//! data_source_id: /subscriptions/.../workspaces/logs
//! query: Perf | where CounterName == "% Processor Time"
//! frequency: 5
//! time_window: 30
//! severity: 2
//! azns_action:
//!   action_group:
//!     - /subscriptions/.../actionGroups/oncall
//! trigger:
//!   operator: GreaterThan
//!   threshold: 90
//! ```

pub mod client;
pub mod data_source;
pub mod expand;
pub mod flatten;
pub mod memory;
pub mod models;
pub mod resource;
pub mod rule;
pub mod schema;

pub use client::{ApiError, ApiResult, ScheduledQueryRulesApi, ScheduledQueryRulesClient};
pub use data_source::ScheduledQueryRulesDataSource;
pub use expand::expand;
pub use flatten::flatten;
pub use memory::InMemoryRulesApi;
pub use models::LogSearchRuleResource;
pub use resource::ScheduledQueryRulesResource;
pub use rule::{RuleConfig, RuleId, RuleState};
pub use schema::{rule_schema, RESOURCE_TYPE};
