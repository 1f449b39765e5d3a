//! Response payload to configuration.
//!
//! Optional values are carried over only when the response has them; absent
//! collections come back empty. Identity (name, resource group) is taken from
//! the parsed identifier rather than the payload.

use super::models::{
    Action, AlertingAction, AzNsActionGroup, Criteria, LogMetricTrigger, LogSearchRuleResource,
    TriggerCondition,
};
use super::rule::{
    ActionType, AznsAction, Criterion, Dimension, MetricTrigger, RuleConfig, RuleId, RuleState,
    Trigger,
};
use crate::azure::normalize_location;
use chrono::SecondsFormat;

/// Map a remote rule back onto the configuration shape.
pub fn flatten(id: &RuleId, resource: &LogSearchRuleResource) -> RuleState {
    let props = &resource.properties;
    let source = &props.source;
    let schedule = props.schedule.clone().unwrap_or_default();

    let mut config = RuleConfig {
        name: id.name.clone(),
        resource_group_name: id.resource_group.clone(),
        location: normalize_location(&resource.location),
        action_type: ActionType::LogToMetric,
        authorized_resources: source.authorized_resources.clone().unwrap_or_default(),
        azns_action: None,
        criteria: Vec::new(),
        data_source_id: source.data_source_id.clone(),
        description: props.description.clone(),
        enabled: props.enabled,
        frequency: schedule.frequency_in_minutes,
        query: source.query.clone(),
        query_type: source.query_type,
        severity: None,
        throttling: None,
        time_window: schedule.time_window_in_minutes,
        trigger: None,
        tags: resource.tags.clone().unwrap_or_default(),
    };

    match &props.action {
        Action::LogToMetric(action) => {
            config.action_type = ActionType::LogToMetric;
            config.criteria = action.criteria.iter().map(flatten_criterion).collect();
        }
        Action::Alerting(action) => flatten_alerting(&mut config, action),
    }

    RuleState {
        id: resource.id.clone().unwrap_or_else(|| id.to_string()),
        config,
        last_updated_time: props
            .last_updated_time
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true)),
        provisioning_state: props.provisioning_state.clone(),
    }
}

fn flatten_alerting(config: &mut RuleConfig, action: &AlertingAction) {
    config.action_type = ActionType::Alerting;
    config.severity = action.severity;
    config.throttling = action.throttling_in_min;
    config.azns_action = action.azns_action.as_ref().map(flatten_azns_action);
    config.trigger = Some(flatten_trigger(&action.trigger));
}

fn flatten_criterion(criteria: &Criteria) -> Criterion {
    let dimensions = criteria
        .dimensions
        .iter()
        .flatten()
        .map(|d| Dimension {
            name: d.name.clone(),
            operator: d.operator,
            values: d.values.clone(),
        })
        .collect();

    Criterion {
        metric_name: criteria.metric_name.clone(),
        dimensions,
    }
}

fn flatten_azns_action(action: &AzNsActionGroup) -> AznsAction {
    AznsAction {
        action_group: action.action_group.clone().unwrap_or_default(),
        custom_webhook_payload: action.custom_webhook_payload.clone(),
        email_subject: action.email_subject.clone(),
    }
}

fn flatten_trigger(trigger: &TriggerCondition) -> Trigger {
    Trigger {
        operator: trigger.threshold_operator,
        threshold: trigger.threshold,
        metric_trigger: trigger.metric_trigger.as_ref().and_then(flatten_metric_trigger),
    }
}

/// Every metric trigger field is required, so a partial one is dropped.
fn flatten_metric_trigger(trigger: &LogMetricTrigger) -> Option<MetricTrigger> {
    Some(MetricTrigger {
        metric_column: trigger.metric_column.clone()?,
        metric_trigger_type: trigger.metric_trigger_type?,
        operator: trigger.threshold_operator?,
        threshold: trigger.threshold?,
    })
}
