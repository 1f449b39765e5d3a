//! Typed scheduled query rule configuration.
//!
//! [`RuleConfig`] is built once from the raw parameter map via
//! [`RuleConfig::from_params`]; every later stage (expand, flatten, the
//! lifecycle handlers) works on the typed record only.

use super::schema::rule_schema;
use crate::azure::{normalize_location, ResourceId, ResourceIdError};
use crate::schema::{ResourceParams, ValidationErrors};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Path segment that names the rule inside its resource identifier.
pub const RULE_SEGMENT: &str = "scheduledQueryRules";

/// Which action the rule runs when it fires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    /// Raise an alert through action groups
    Alerting,
    /// Emit a metric from the query result
    #[default]
    LogToMetric,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionType::Alerting => write!(f, "Alerting"),
            ActionType::LogToMetric => write!(f, "LogToMetric"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryType {
    #[default]
    ResultCount,
}

/// Comparison used by triggers and metric triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConditionalOperator {
    GreaterThan,
    LessThan,
    Equal,
}

/// How metric trigger breaches are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MetricTriggerType {
    Consecutive,
    Total,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DimensionOperator {
    Include,
}

/// Alert severity, 0 (critical) to 4 (verbose).
///
/// Configured as an integer; the API carries it as a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Severity {
    Critical,
    Error,
    Warning,
    Informational,
    Verbose,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::Error,
        Severity::Warning,
        Severity::Informational,
        Severity::Verbose,
    ];

    pub fn level(self) -> i64 {
        match self {
            Severity::Critical => 0,
            Severity::Error => 1,
            Severity::Warning => 2,
            Severity::Informational => 3,
            Severity::Verbose => 4,
        }
    }

    /// Wire form: `"0"` through `"4"`.
    pub fn as_wire_str(self) -> &'static str {
        match self {
            Severity::Critical => "0",
            Severity::Error => "1",
            Severity::Warning => "2",
            Severity::Informational => "3",
            Severity::Verbose => "4",
        }
    }

    pub fn from_wire_str(s: &str) -> Result<Self, String> {
        let level: i64 = s
            .trim()
            .parse()
            .map_err(|_| format!("invalid severity '{}'", s))?;
        Self::try_from(level)
    }
}

impl TryFrom<i64> for Severity {
    type Error = String;

    fn try_from(level: i64) -> Result<Self, String> {
        Self::ALL
            .iter()
            .copied()
            .find(|s| s.level() == level)
            .ok_or_else(|| format!("severity must be between 0 and 4, got {}", level))
    }
}

impl From<Severity> for i64 {
    fn from(severity: Severity) -> Self {
        severity.level()
    }
}

/// One dimension of a log-to-metric criterion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub operator: DimensionOperator,
    /// Ordered; order is significant
    pub values: Vec<String>,
}

/// Metric emitted by a log-to-metric rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Criterion {
    pub metric_name: String,
    #[serde(rename = "dimension")]
    pub dimensions: Vec<Dimension>,
}

/// Action group notification settings of an alerting rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AznsAction {
    pub action_group: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_webhook_payload: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_subject: Option<String>,
}

/// Secondary condition evaluated per metric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricTrigger {
    pub metric_column: String,
    pub metric_trigger_type: MetricTriggerType,
    pub operator: ConditionalOperator,
    pub threshold: f64,
}

/// Condition that fires an alerting rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub operator: ConditionalOperator,
    pub threshold: f64,
    #[serde(default, with = "single_block", skip_serializing_if = "Option::is_none")]
    pub metric_trigger: Option<MetricTrigger>,
}

/// User-declared scheduled query rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub name: String,
    pub resource_group_name: String,
    /// Normalized region name
    pub location: String,
    #[serde(default)]
    pub action_type: ActionType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authorized_resources: Vec<String>,
    #[serde(default, with = "single_block", skip_serializing_if = "Option::is_none")]
    pub azns_action: Option<AznsAction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub criteria: Vec<Criterion>,
    pub data_source_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Minutes between query runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_type: Option<QueryType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    /// Minutes to suppress further alerts after one fires
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throttling: Option<i64>,
    /// Minutes of data the query looks back over
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_window: Option<i64>,
    #[serde(default, with = "single_block", skip_serializing_if = "Option::is_none")]
    pub trigger: Option<Trigger>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

fn default_enabled() -> bool {
    true
}

impl RuleConfig {
    /// Build a typed configuration from raw parameters.
    ///
    /// Runs the schema (types, defaults, validators), then the checks that
    /// span several fields. All problems are reported together.
    pub fn from_params(params: &ResourceParams) -> Result<Self, ValidationErrors> {
        let normalized = rule_schema().validate(params)?;
        let mut config: RuleConfig = serde_json::from_value(Value::Object(normalized))
            .map_err(|e| ValidationErrors::single("config", e.to_string()))?;
        config.location = normalize_location(&config.location);
        config.validate_action_fields()?;
        Ok(config)
    }

    /// Serialize back to the raw parameter shape accepted by
    /// [`from_params`](Self::from_params).
    pub fn to_params(&self) -> ResourceParams {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map.into_iter().collect(),
            _ => ResourceParams::new(),
        }
    }

    /// Reject fields that belong to the other action variant.
    pub fn validate_action_fields(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        match self.action_type {
            ActionType::LogToMetric => {
                let alerting_only = [
                    ("azns_action", self.azns_action.is_some()),
                    ("severity", self.severity.is_some()),
                    ("throttling", self.throttling.is_some()),
                    ("trigger", self.trigger.is_some()),
                ];
                for (field, set) in alerting_only {
                    if set {
                        errors.push(field, "can only be set when action_type is Alerting");
                    }
                }
            }
            ActionType::Alerting => {
                if self.trigger.is_none() {
                    errors.push("trigger", "is required when action_type is Alerting");
                }
                if !self.criteria.is_empty() {
                    errors.push("criteria", "can only be set when action_type is LogToMetric");
                }
            }
        }

        errors.into_result(())
    }

    /// Identifier of the rule in the given subscription.
    pub fn rule_id(&self, subscription_id: &str) -> RuleId {
        RuleId::new(subscription_id, &self.resource_group_name, &self.name)
    }

    /// Equal up to the ordering of set-valued fields.
    pub fn is_equivalent(&self, other: &RuleConfig) -> bool {
        self.canonical() == other.canonical()
    }

    /// Copy with every set-valued collection sorted and de-duplicated.
    pub fn canonical(&self) -> RuleConfig {
        let mut c = self.clone();
        sort_dedup(&mut c.authorized_resources);
        for criterion in &mut c.criteria {
            sort_dedup(&mut criterion.dimensions);
        }
        sort_dedup(&mut c.criteria);
        if let Some(action) = &mut c.azns_action {
            sort_dedup(&mut action.action_group);
        }
        c
    }
}

fn sort_dedup<T: Ord>(items: &mut Vec<T>) {
    items.sort();
    items.dedup();
}

/// Flattened remote rule: configuration plus server-assigned attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleState {
    pub id: String,
    #[serde(flatten)]
    pub config: RuleConfig,
    /// RFC 3339
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

impl RuleState {
    /// Attribute map as stored by the host.
    pub fn to_attributes(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// Identity of a scheduled query rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleId {
    pub subscription_id: String,
    pub resource_group: String,
    pub name: String,
}

impl RuleId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            name: name.into(),
        }
    }

    /// Parse a stored identifier. The segment names are matched
    /// case-insensitively.
    pub fn parse(id: &str) -> Result<Self, ResourceIdError> {
        let parsed = ResourceId::parse(id)?;
        let resource_group = parsed.require_resource_group()?.to_string();
        let name = parsed.require_segment(RULE_SEGMENT)?.to_string();
        Ok(Self {
            subscription_id: parsed.subscription_id,
            resource_group,
            name,
        })
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Insights/{}/{}",
            self.subscription_id, self.resource_group, RULE_SEGMENT, self.name
        )
    }
}

/// Serde adapter for an optional block stored as a list of at most one
/// element.
mod single_block {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S, T>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        serializer.collect_seq(value.iter())
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        let mut items: Vec<T> = Vec::deserialize(deserializer)?;
        match items.len() {
            0 | 1 => Ok(items.pop()),
            n => Err(D::Error::custom(format!(
                "expected at most one block, got {}",
                n
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn params(value: Value) -> ResourceParams {
        serde_json::from_value(value).unwrap()
    }

    fn log_to_metric() -> Value {
        json!({
            "name": "r1",
            "resource_group_name": "rg1",
            "location": "West Europe",
            "data_source_id": "/subscriptions/sub/resourceGroups/rg1/providers/Microsoft.Insights/components/ai",
            "criteria": [{
                "metric_name": "Average_% Idle Time",
                "dimension": [{"name": "InstanceName", "operator": "Include", "values": [""]}]
            }]
        })
    }

    fn alerting() -> Value {
        json!({
            "name": "r2",
            "resource_group_name": "rg1",
            "location": "eastus",
            "action_type": "Alerting",
            "data_source_id": "/subscriptions/sub/resourceGroups/rg1/providers/Microsoft.OperationalInsights/workspaces/ws",
            "query": "Heartbeat | count",
            "frequency": 60,
            "time_window": 60,
            "severity": 3,
            "azns_action": [{"action_group": ["/subscriptions/sub/resourceGroups/rg1/providers/Microsoft.Insights/actionGroups/ag"]}],
            "trigger": [{"operator": "GreaterThan", "threshold": 5000}]
        })
    }

    #[test]
    fn test_from_params_applies_defaults() {
        let config = RuleConfig::from_params(&params(log_to_metric())).unwrap();
        assert_eq!(config.action_type, ActionType::LogToMetric);
        assert!(config.enabled);
        assert_eq!(config.query_type, Some(QueryType::ResultCount));
        assert_eq!(config.location, "westeurope");
        assert_eq!(config.criteria.len(), 1);
        assert_eq!(config.criteria[0].dimensions[0].values, vec![String::new()]);
    }

    #[test]
    fn test_from_params_alerting() {
        let config = RuleConfig::from_params(&params(alerting())).unwrap();
        assert_eq!(config.severity, Some(Severity::Informational));
        let action = config.azns_action.unwrap();
        assert_eq!(action.custom_webhook_payload.as_deref(), Some("{}"));
        assert_eq!(config.trigger.unwrap().threshold, 5000.0);
    }

    #[test]
    fn test_severity_out_of_range_rejected() {
        for severity in [-1, 5, 10] {
            let mut raw = alerting();
            raw["severity"] = json!(severity);
            let errors = RuleConfig::from_params(&params(raw)).unwrap_err();
            assert!(errors.contains_path("severity"), "{}", errors);
        }
    }

    #[test]
    fn test_dimension_operator_rejected() {
        let mut raw = log_to_metric();
        raw["criteria"][0]["dimension"][0]["operator"] = json!("Exclude");
        let errors = RuleConfig::from_params(&params(raw)).unwrap_err();
        assert!(errors.contains_path("criteria.0.dimension.0.operator"));
    }

    #[test]
    fn test_cross_variant_fields_rejected() {
        let mut raw = log_to_metric();
        raw["severity"] = json!(1);
        raw["trigger"] = json!([{"operator": "Equal", "threshold": 1}]);
        let errors = RuleConfig::from_params(&params(raw)).unwrap_err();
        assert!(errors.contains_path("severity"));
        assert!(errors.contains_path("trigger"));

        let mut raw = alerting();
        raw.as_object_mut().unwrap().remove("trigger");
        let errors = RuleConfig::from_params(&params(raw)).unwrap_err();
        assert!(errors.contains_path("trigger"));
    }

    #[test]
    fn test_log_to_metric_without_criteria_accepted() {
        let mut raw = log_to_metric();
        raw.as_object_mut().unwrap().remove("criteria");
        let config = RuleConfig::from_params(&params(raw)).unwrap();
        assert!(config.criteria.is_empty());
    }

    #[test]
    fn test_computed_fields_rejected() {
        let mut raw = log_to_metric();
        raw["provisioning_state"] = json!("Succeeded");
        let errors = RuleConfig::from_params(&params(raw)).unwrap_err();
        assert!(errors.contains_path("provisioning_state"));
    }

    #[test]
    fn test_to_params_round_trips() {
        let config = RuleConfig::from_params(&params(alerting())).unwrap();
        let again = RuleConfig::from_params(&config.to_params()).unwrap();
        assert_eq!(again, config);
    }

    #[test]
    fn test_is_equivalent_ignores_set_order() {
        let mut a = RuleConfig::from_params(&params(log_to_metric())).unwrap();
        a.authorized_resources = vec!["b".into(), "a".into()];
        let mut b = a.clone();
        b.authorized_resources = vec!["a".into(), "b".into(), "a".into()];
        assert!(a.is_equivalent(&b));

        b.authorized_resources = vec!["a".into()];
        assert!(!a.is_equivalent(&b));
    }

    #[test]
    fn test_severity_wire_form() {
        assert_eq!(Severity::Warning.as_wire_str(), "2");
        assert_eq!(Severity::from_wire_str("4").unwrap(), Severity::Verbose);
        assert!(Severity::from_wire_str("5").is_err());
        assert!(Severity::from_wire_str("high").is_err());
    }

    #[test]
    fn test_rule_id_parse_and_display() {
        let id = RuleId::parse(
            "/subscriptions/sub/resourcegroups/rg1/providers/Microsoft.Insights/scheduledqueryrules/r1",
        )
        .unwrap();
        assert_eq!(id, RuleId::new("sub", "rg1", "r1"));
        assert_eq!(
            id.to_string(),
            "/subscriptions/sub/resourceGroups/rg1/providers/Microsoft.Insights/scheduledQueryRules/r1"
        );
        assert!(RuleId::parse("/subscriptions/sub/resourceGroups/rg1").is_err());
        assert!(RuleId::parse("garbage").is_err());
    }

    #[test]
    fn test_state_attributes_include_computed() {
        let config = RuleConfig::from_params(&params(log_to_metric())).unwrap();
        let state = RuleState {
            id: config.rule_id("sub").to_string(),
            config,
            last_updated_time: Some("2020-01-01T00:00:00Z".into()),
            provisioning_state: Some("Succeeded".into()),
        };
        let attrs = state.to_attributes();
        assert_eq!(attrs.get("provisioning_state"), Some(&json!("Succeeded")));
        assert_eq!(attrs.get("name"), Some(&json!("r1")));
        assert!(attrs.contains_key("id"));
    }
}
