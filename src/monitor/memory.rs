//! In-memory scheduled query rules backend.
//!
//! Behaves like the REST API for the three operations the handlers use, so
//! lifecycle code can run offline and in tests. Failures and latency can be
//! injected per operation.

use super::client::{error_for_status, ApiError, ApiResult, ScheduledQueryRulesApi};
use super::models::LogSearchRuleResource;
use super::rule::RuleId;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use reqwest::StatusCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// API operation, used to target injected failures and count calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateOrUpdate,
    Get,
    Delete,
}

#[derive(Clone)]
pub struct InMemoryRulesApi {
    subscription_id: String,
    rules: Arc<DashMap<(String, String), LogSearchRuleResource>>,
    failures: Arc<DashMap<Operation, (StatusCode, String)>>,
    calls: Arc<DashMap<Operation, AtomicUsize>>,
    latency: Arc<Mutex<Option<Duration>>>,
}

impl InMemoryRulesApi {
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            rules: Arc::new(DashMap::new()),
            failures: Arc::new(DashMap::new()),
            calls: Arc::new(DashMap::new()),
            latency: Arc::new(Mutex::new(None)),
        }
    }

    // Resource group and rule names are case-insensitive in ARM.
    fn key(resource_group: &str, name: &str) -> (String, String) {
        (resource_group.to_lowercase(), name.to_lowercase())
    }

    /// Store a rule directly, as if created out of band.
    pub fn insert(&self, resource_group: &str, name: &str, rule: LogSearchRuleResource) {
        let stored = self.materialize(resource_group, name, rule);
        self.rules.insert(Self::key(resource_group, name), stored);
    }

    /// Remove a rule directly, as if deleted out of band.
    pub fn remove(&self, resource_group: &str, name: &str) -> bool {
        self.rules.remove(&Self::key(resource_group, name)).is_some()
    }

    pub fn contains(&self, resource_group: &str, name: &str) -> bool {
        self.rules.contains_key(&Self::key(resource_group, name))
    }

    pub fn stored(&self, resource_group: &str, name: &str) -> Option<LogSearchRuleResource> {
        self.rules
            .get(&Self::key(resource_group, name))
            .map(|r| r.value().clone())
    }

    pub fn count(&self) -> usize {
        self.rules.len()
    }

    /// Fail the next call of `operation` with the given status.
    pub fn fail_next(&self, operation: Operation, status: StatusCode, message: impl Into<String>) {
        self.failures.insert(operation, (status, message.into()));
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    /// Number of calls made for `operation`.
    pub fn calls(&self, operation: Operation) -> usize {
        self.calls
            .get(&operation)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    async fn enter(&self, operation: Operation) -> ApiResult<()> {
        self.calls
            .entry(operation)
            .or_insert_with(|| AtomicUsize::new(0))
            .fetch_add(1, Ordering::SeqCst);

        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        match self.failures.remove(&operation) {
            Some((_, (status, message))) => {
                let body = serde_json::json!({"error": {"message": message}}).to_string();
                Err(error_for_status(status, &body))
            }
            None => Ok(()),
        }
    }

    fn materialize(
        &self,
        resource_group: &str,
        name: &str,
        mut rule: LogSearchRuleResource,
    ) -> LogSearchRuleResource {
        let id = RuleId::new(&self.subscription_id, resource_group, name);
        rule.id = Some(id.to_string());
        rule.name = Some(name.to_string());
        rule.resource_type = Some("Microsoft.Insights/scheduledQueryRules".to_string());
        rule.properties.last_updated_time = Some(Utc::now());
        rule.properties.provisioning_state = Some("Succeeded".to_string());
        rule
    }
}

#[async_trait]
impl ScheduledQueryRulesApi for InMemoryRulesApi {
    fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        rule: &LogSearchRuleResource,
    ) -> ApiResult<LogSearchRuleResource> {
        self.enter(Operation::CreateOrUpdate).await?;
        let stored = self.materialize(resource_group, name, rule.clone());
        self.rules
            .insert(Self::key(resource_group, name), stored.clone());
        Ok(stored)
    }

    async fn get(&self, resource_group: &str, name: &str) -> ApiResult<LogSearchRuleResource> {
        self.enter(Operation::Get).await?;
        self.stored(resource_group, name).ok_or(ApiError::NotFound)
    }

    async fn delete(&self, resource_group: &str, name: &str) -> ApiResult<()> {
        self.enter(Operation::Delete).await?;
        if self.remove(resource_group, name) {
            Ok(())
        } else {
            Err(ApiError::NotFound)
        }
    }
}
