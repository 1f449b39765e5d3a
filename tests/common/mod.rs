//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use azmon_rules::monitor::{expand, RuleConfig, ScheduledQueryRulesClient};
use azmon_rules::schema::ResourceParams;
use serde_json::{json, Value};
use std::time::Duration;

pub const SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000000";

pub const WORKSPACE_ID: &str = "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg1/providers/Microsoft.OperationalInsights/workspaces/logs";

pub const ACTION_GROUP_ID: &str = "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg1/providers/Microsoft.Insights/actionGroups/oncall";

/// ARM path of a rule in [`SUBSCRIPTION`].
pub fn rule_path(resource_group: &str, name: &str) -> String {
    format!(
        "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Insights/scheduledQueryRules/{}",
        SUBSCRIPTION, resource_group, name
    )
}

pub fn params(value: Value) -> ResourceParams {
    serde_json::from_value(value).expect("fixture params must be an object")
}

/// Log-to-metric rule emitting `Average_% Idle Time` per instance.
pub fn log_to_metric_params(name: &str) -> ResourceParams {
    params(json!({
        "name": name,
        "resource_group_name": "rg1",
        "location": "West Europe",
        "data_source_id": WORKSPACE_ID,
        "description": "idle time per instance",
        "criteria": [{
            "metric_name": "Average_% Idle Time",
            "dimension": [{
                "name": "InstanceName",
                "operator": "Include",
                "values": ["1"]
            }]
        }]
    }))
}

/// Alerting rule on high processor time.
pub fn alerting_params(name: &str) -> ResourceParams {
    params(json!({
        "name": name,
        "resource_group_name": "rg1",
        "location": "eastus",
        "action_type": "Alerting",
        "data_source_id": WORKSPACE_ID,
        "query": "Perf | where CounterName == \"% Processor Time\"",
        "frequency": 5,
        "time_window": 30,
        "severity": 2,
        "throttling": 10,
        "azns_action": [{
            "action_group": [ACTION_GROUP_ID],
            "email_subject": "CPU high"
        }],
        "trigger": [{
            "operator": "GreaterThan",
            "threshold": 90.0,
            "metric_trigger": [{
                "metric_column": "Computer",
                "metric_trigger_type": "Consecutive",
                "operator": "GreaterThan",
                "threshold": 3.0
            }]
        }],
        "tags": {"team": "ops"}
    }))
}

/// Response body the API returns for a stored rule.
pub fn remote_body(config: &RuleConfig) -> Value {
    let mut body = serde_json::to_value(expand(config)).expect("rule serializes");
    body["id"] = json!(config.rule_id(SUBSCRIPTION).to_string());
    body["name"] = json!(config.name);
    body["type"] = json!("Microsoft.Insights/scheduledQueryRules");
    body["properties"]["provisioningState"] = json!("Succeeded");
    body["properties"]["lastUpdatedTime"] = json!("2024-05-01T10:00:00Z");
    body
}

/// Client pointed at a mock server, with retries that do not slow tests
/// down.
pub fn client(endpoint: &str) -> ScheduledQueryRulesClient {
    ScheduledQueryRulesClient::builder()
        .endpoint(endpoint)
        .subscription_id(SUBSCRIPTION)
        .token("test-token")
        .max_retries(2)
        .retry_delay(Duration::from_millis(1))
        .build()
        .expect("client builds")
}
