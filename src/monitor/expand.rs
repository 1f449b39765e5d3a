//! Configuration to request payload.

use super::models::{
    Action, AlertingAction, AzNsActionGroup, Criteria, LogMetricTrigger, LogSearchRule,
    LogSearchRuleResource, LogToMetricAction, Schedule, Source, TriggerCondition, WireDimension,
};
use super::rule::{
    ActionType, AznsAction, ConditionalOperator, Criterion, MetricTrigger, RuleConfig, Trigger,
};
use crate::azure::normalize_location;

/// Build the create-or-update payload for a rule.
///
/// The configuration must have passed [`RuleConfig::from_params`]; an
/// alerting rule without a trigger is a caller bug and trips a debug
/// assertion.
pub fn expand(config: &RuleConfig) -> LogSearchRuleResource {
    LogSearchRuleResource {
        id: None,
        name: None,
        resource_type: None,
        location: normalize_location(&config.location),
        tags: Some(config.tags.clone()),
        properties: LogSearchRule {
            description: config.description.clone(),
            enabled: config.enabled,
            last_updated_time: None,
            provisioning_state: None,
            source: expand_source(config),
            schedule: expand_schedule(config),
            action: expand_action(config),
        },
    }
}

fn expand_source(config: &RuleConfig) -> Source {
    let authorized_resources =
        (!config.authorized_resources.is_empty()).then(|| config.authorized_resources.clone());

    Source {
        query: config.query.clone(),
        authorized_resources,
        data_source_id: config.data_source_id.clone(),
        query_type: config.query_type,
    }
}

fn expand_schedule(config: &RuleConfig) -> Option<Schedule> {
    if config.frequency.is_none() && config.time_window.is_none() {
        return None;
    }
    Some(Schedule {
        frequency_in_minutes: config.frequency,
        time_window_in_minutes: config.time_window,
    })
}

fn expand_action(config: &RuleConfig) -> Action {
    match config.action_type {
        ActionType::LogToMetric => Action::LogToMetric(LogToMetricAction {
            criteria: config.criteria.iter().map(expand_criterion).collect(),
        }),
        ActionType::Alerting => Action::Alerting(AlertingAction {
            severity: config.severity,
            azns_action: config.azns_action.as_ref().map(expand_azns_action),
            throttling_in_min: config.throttling,
            trigger: expand_trigger(config.trigger.as_ref()),
        }),
    }
}

fn expand_criterion(criterion: &Criterion) -> Criteria {
    let dimensions = criterion
        .dimensions
        .iter()
        .map(|d| WireDimension {
            name: d.name.clone(),
            operator: d.operator,
            values: d.values.clone(),
        })
        .collect();

    Criteria {
        metric_name: criterion.metric_name.clone(),
        dimensions: Some(dimensions),
    }
}

fn expand_azns_action(action: &AznsAction) -> AzNsActionGroup {
    AzNsActionGroup {
        action_group: Some(action.action_group.clone()),
        email_subject: action.email_subject.clone(),
        custom_webhook_payload: action.custom_webhook_payload.clone(),
    }
}

fn expand_trigger(trigger: Option<&Trigger>) -> TriggerCondition {
    debug_assert!(trigger.is_some(), "alerting rule expanded without a trigger");
    let Some(trigger) = trigger else {
        return TriggerCondition {
            threshold_operator: ConditionalOperator::GreaterThan,
            threshold: 0.0,
            metric_trigger: None,
        };
    };

    TriggerCondition {
        threshold_operator: trigger.operator,
        threshold: trigger.threshold,
        metric_trigger: trigger.metric_trigger.as_ref().map(expand_metric_trigger),
    }
}

fn expand_metric_trigger(trigger: &MetricTrigger) -> LogMetricTrigger {
    LogMetricTrigger {
        threshold_operator: Some(trigger.operator),
        threshold: Some(trigger.threshold),
        metric_trigger_type: Some(trigger.metric_trigger_type),
        metric_column: Some(trigger.metric_column.clone()),
    }
}
