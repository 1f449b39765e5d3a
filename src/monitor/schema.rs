//! Field table of the scheduled query rule resource.

use crate::schema::{BlockSchema, FieldSchema, Presence, ValueType, Validator};
use once_cell::sync::Lazy;
use serde_json::json;

/// Type name under which the resource is registered.
pub const RESOURCE_TYPE: &str = "azurerm_monitor_scheduled_query_rules";

/// Allowed frequency, in minutes.
pub const FREQUENCY_RANGE: (i64, i64) = (5, 1440);
/// Allowed time window, in minutes.
pub const TIME_WINDOW_RANGE: (i64, i64) = (5, 2880);
/// Allowed throttling, in minutes.
pub const THROTTLING_RANGE: (i64, i64) = (0, 10000);

const OPERATORS: &[&str] = &["GreaterThan", "LessThan", "Equal"];

static RULE_SCHEMA: Lazy<BlockSchema> = Lazy::new(build_rule_schema);

/// The resource schema, including nested blocks.
pub fn rule_schema() -> &'static BlockSchema {
    &RULE_SCHEMA
}

fn azns_action_schema() -> BlockSchema {
    BlockSchema::new(vec![
        FieldSchema::set("action_group", ValueType::String, Presence::Required)
            .validator(Validator::ResourceId)
            .describe("Action group resource IDs to notify"),
        FieldSchema::optional("custom_webhook_payload", ValueType::String)
            .default_value(json!("{}"))
            .validator(Validator::JsonString)
            .describe("JSON payload sent to webhooks"),
        FieldSchema::optional("email_subject", ValueType::String)
            .describe("Custom subject for notification emails"),
    ])
}

fn criteria_schema() -> BlockSchema {
    let dimension = BlockSchema::new(vec![
        FieldSchema::required("name", ValueType::String),
        FieldSchema::required("operator", ValueType::String)
            .validator(Validator::one_of(&["Include"])),
        FieldSchema::list("values", ValueType::String, Presence::Required),
    ]);

    BlockSchema::new(vec![
        FieldSchema::block("dimension", dimension, Presence::Required),
        FieldSchema::required("metric_name", ValueType::String)
            .validator(Validator::NoEmptyStrings),
    ])
}

fn trigger_schema() -> BlockSchema {
    let metric_trigger = BlockSchema::new(vec![
        FieldSchema::required("metric_column", ValueType::String),
        FieldSchema::required("metric_trigger_type", ValueType::String)
            .validator(Validator::one_of(&["Consecutive", "Total"])),
        FieldSchema::required("operator", ValueType::String).validator(Validator::one_of(OPERATORS)),
        FieldSchema::required("threshold", ValueType::Float).validator(Validator::NoZeroValues),
    ]);

    BlockSchema::new(vec![
        FieldSchema::block("metric_trigger", metric_trigger, Presence::Optional).max_items(1),
        FieldSchema::required("operator", ValueType::String).validator(Validator::one_of(OPERATORS)),
        FieldSchema::required("threshold", ValueType::Float),
    ])
}

fn build_rule_schema() -> BlockSchema {
    BlockSchema::new(vec![
        FieldSchema::required("name", ValueType::String)
            .force_new()
            .validator(Validator::NoEmptyStrings)
            .describe("Name of the rule"),
        FieldSchema::required("resource_group_name", ValueType::String)
            .force_new()
            .validator(Validator::ResourceGroupName)
            .describe("Resource group holding the rule"),
        FieldSchema::required("location", ValueType::String)
            .force_new()
            .validator(Validator::NoEmptyStrings)
            .describe("Azure region"),
        FieldSchema::optional("action_type", ValueType::String)
            .force_new()
            .default_value(json!("LogToMetric"))
            .validator(Validator::one_of(&["Alerting", "LogToMetric"]))
            .describe("Alerting or LogToMetric"),
        FieldSchema::set("authorized_resources", ValueType::String, Presence::Optional)
            .validator(Validator::ResourceId)
            .describe("Resources the query may read across"),
        FieldSchema::block("azns_action", azns_action_schema(), Presence::Optional)
            .max_items(1)
            .describe("Notification settings (Alerting only)"),
        FieldSchema::block("criteria", criteria_schema(), Presence::Optional)
            .describe("Metrics to emit (LogToMetric only)"),
        FieldSchema::required("data_source_id", ValueType::String)
            .validator(Validator::ResourceId)
            .describe("Resource the query runs against"),
        FieldSchema::optional("description", ValueType::String),
        FieldSchema::optional("enabled", ValueType::Bool).default_value(json!(true)),
        FieldSchema::optional("frequency", ValueType::Int)
            .validator(Validator::IntBetween(FREQUENCY_RANGE.0, FREQUENCY_RANGE.1))
            .describe("Minutes between query runs"),
        FieldSchema::computed("last_updated_time", ValueType::String),
        FieldSchema::computed("provisioning_state", ValueType::String),
        FieldSchema::optional("query", ValueType::String).describe("Log search query"),
        FieldSchema::optional("query_type", ValueType::String)
            .default_value(json!("ResultCount"))
            .validator(Validator::one_of(&["ResultCount"])),
        FieldSchema::optional("severity", ValueType::Int)
            .validator(Validator::IntInSlice(vec![0, 1, 2, 3, 4]))
            .describe("Alert severity (Alerting only)"),
        FieldSchema::optional("throttling", ValueType::Int)
            .validator(Validator::IntBetween(THROTTLING_RANGE.0, THROTTLING_RANGE.1))
            .describe("Minutes to suppress repeat alerts (Alerting only)"),
        FieldSchema::optional("time_window", ValueType::Int)
            .validator(Validator::IntBetween(TIME_WINDOW_RANGE.0, TIME_WINDOW_RANGE.1))
            .describe("Minutes of data each run looks back over"),
        FieldSchema::block("trigger", trigger_schema(), Presence::Optional)
            .max_items(1)
            .describe("Firing condition (Alerting only)"),
        FieldSchema::map("tags", ValueType::String, Presence::Optional).validator(Validator::Tags),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldKind;

    #[test]
    fn test_force_new_fields() {
        assert_eq!(
            rule_schema().force_new_fields(),
            vec!["name", "resource_group_name", "location", "action_type"]
        );
    }

    #[test]
    fn test_computed_fields() {
        let computed: Vec<&str> = rule_schema()
            .fields
            .iter()
            .filter(|f| f.presence == Presence::Computed)
            .map(|f| f.name)
            .collect();
        assert_eq!(computed, vec!["last_updated_time", "provisioning_state"]);
    }

    #[test]
    fn test_defaults() {
        let schema = rule_schema();
        assert_eq!(schema.field("enabled").unwrap().default, Some(json!(true)));
        assert_eq!(schema.field("query_type").unwrap().default, Some(json!("ResultCount")));
        assert_eq!(schema.field("action_type").unwrap().default, Some(json!("LogToMetric")));

        let FieldKind::Block { schema: azns, max_items, .. } = &schema.field("azns_action").unwrap().kind
        else {
            panic!("azns_action should be a block");
        };
        assert_eq!(*max_items, Some(1));
        assert_eq!(
            azns.field("custom_webhook_payload").unwrap().default,
            Some(json!("{}"))
        );
    }

    #[test]
    fn test_dimension_is_required_block() {
        let FieldKind::Block { schema: criteria, .. } = &rule_schema().field("criteria").unwrap().kind
        else {
            panic!("criteria should be a block");
        };
        let FieldKind::Block { min_items, .. } = &criteria.field("dimension").unwrap().kind else {
            panic!("dimension should be a block");
        };
        assert_eq!(*min_items, 1);
    }
}
