//! Wire types of the `Microsoft.Insights/scheduledQueryRules` API.
//!
//! Field names follow the REST payload (camelCase). The rule action is a
//! union discriminated by the `odata.type` property.

use super::rule::{
    ConditionalOperator, DimensionOperator, MetricTriggerType, QueryType, Severity,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// API version used for every request.
pub const API_VERSION: &str = "2018-04-16";

/// Common prefix of every action discriminator.
pub const ODATA_TYPE_PREFIX: &str = "Microsoft.WindowsAzure.Management.Monitoring.Alerts.Models.Microsoft.AppInsights.Nexus.DataContracts.Resources.ScheduledQueryRules.";

pub const ODATA_TYPE_ALERTING: &str = "Microsoft.WindowsAzure.Management.Monitoring.Alerts.Models.Microsoft.AppInsights.Nexus.DataContracts.Resources.ScheduledQueryRules.AlertingAction";

pub const ODATA_TYPE_LOG_TO_METRIC: &str = "Microsoft.WindowsAzure.Management.Monitoring.Alerts.Models.Microsoft.AppInsights.Nexus.DataContracts.Resources.ScheduledQueryRules.LogToMetricAction";

/// A scheduled query rule as sent to and returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSearchRuleResource {
    /// Server-assigned; never sent
    #[serde(default, skip_serializing)]
    pub id: Option<String>,
    #[serde(default, skip_serializing)]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing)]
    pub resource_type: Option<String>,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
    pub properties: LogSearchRule,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogSearchRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `"true"` or `"false"` on the wire
    #[serde(default, with = "enabled_flag")]
    pub enabled: bool,
    #[serde(default, skip_serializing)]
    pub last_updated_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing)]
    pub provisioning_state: Option<String>,
    pub source: Source,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Schedule>,
    pub action: Action,
}

/// Query and the data it runs against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorized_resources: Option<Vec<String>>,
    pub data_source_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_type: Option<QueryType>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_in_minutes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_window_in_minutes: Option<i64>,
}

/// Rule action, tagged by `odata.type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "odata.type")]
pub enum Action {
    #[serde(
        rename = "Microsoft.WindowsAzure.Management.Monitoring.Alerts.Models.Microsoft.AppInsights.Nexus.DataContracts.Resources.ScheduledQueryRules.AlertingAction"
    )]
    Alerting(AlertingAction),
    #[serde(
        rename = "Microsoft.WindowsAzure.Management.Monitoring.Alerts.Models.Microsoft.AppInsights.Nexus.DataContracts.Resources.ScheduledQueryRules.LogToMetricAction"
    )]
    LogToMetric(LogToMetricAction),
}

impl Action {
    /// The `odata.type` discriminator of this variant.
    pub fn odata_type(&self) -> &'static str {
        match self {
            Action::Alerting(_) => ODATA_TYPE_ALERTING,
            Action::LogToMetric(_) => ODATA_TYPE_LOG_TO_METRIC,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogToMetricAction {
    #[serde(default)]
    pub criteria: Vec<Criteria>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criteria {
    pub metric_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Vec<WireDimension>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireDimension {
    pub name: String,
    pub operator: DimensionOperator,
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertingAction {
    /// `"0"` through `"4"` on the wire
    #[serde(default, with = "severity_string", skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azns_action: Option<AzNsActionGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throttling_in_min: Option<i64>,
    pub trigger: TriggerCondition,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzNsActionGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_group: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_webhook_payload: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerCondition {
    pub threshold_operator: ConditionalOperator,
    pub threshold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_trigger: Option<LogMetricTrigger>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogMetricTrigger {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_operator: Option<ConditionalOperator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_trigger_type: Option<MetricTriggerType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_column: Option<String>,
}

/// ARM error envelope: `{"error": {"code": "...", "message": "..."}}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: Option<ErrorDetail>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// `bool` carried as the strings `"true"` / `"false"`.
mod enabled_flag {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "true" } else { "false" })
    }

    /// Anything other than `"true"` reads as disabled.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.is_some_and(|s| s.eq_ignore_ascii_case("true")))
    }
}

mod severity_string {
    use super::Severity;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Severity>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(severity) => serializer.serialize_str(severity.as_wire_str()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Severity>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| Severity::from_wire_str(&s).map_err(D::Error::custom))
            .transpose()
    }
}
