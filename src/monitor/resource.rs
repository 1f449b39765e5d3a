//! Lifecycle handlers for scheduled query rules.
//!
//! Create and update share one path: the API is an idempotent upsert, so
//! both expand the configuration, PUT it, fetch the result and hand over to
//! read. Read treats a missing rule as drift and clears the id; delete treats
//! it as already done.

use super::client::ScheduledQueryRulesApi;
use super::expand::expand;
use super::flatten::flatten;
use super::rule::{RuleConfig, RuleId};
use super::schema::{rule_schema, RESOURCE_TYPE};
use crate::provider::{
    configurable_params, force_new_changes, run_with_timeout, Phase, ProviderContext, Resource, ResourceData,
    ResourceError, ResourceResult, ResourceTimeouts,
};
use crate::schema::{BlockSchema, ResourceParams};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// The `azurerm_monitor_scheduled_query_rules` resource.
pub struct ScheduledQueryRulesResource {
    client: Arc<dyn ScheduledQueryRulesApi>,
    timeouts: ResourceTimeouts,
}

impl ScheduledQueryRulesResource {
    pub fn new(client: Arc<dyn ScheduledQueryRulesApi>) -> Self {
        Self {
            client,
            timeouts: ResourceTimeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: ResourceTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    async fn create_or_update(
        &self,
        data: &mut ResourceData,
        ctx: &ProviderContext,
    ) -> ResourceResult<()> {
        let config = RuleConfig::from_params(data.params())?;
        let name = config.name.as_str();
        let resource_group = config.resource_group_name.as_str();

        if ctx.features.resources_must_be_imported && data.is_new_resource() {
            self.ensure_absent(name, resource_group).await?;
        }

        let payload = expand(&config);
        self.client
            .create_or_update(resource_group, name, &payload)
            .await
            .map_err(|e| {
                ResourceError::api("creating or updating scheduled query rule", name, resource_group, e)
            })?;

        let read = self
            .client
            .get(resource_group, name)
            .await
            .map_err(|e| ResourceError::api("retrieving scheduled query rule", name, resource_group, e))?;
        let id = read
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ResourceError::MissingId {
                name: name.to_string(),
                resource_group: resource_group.to_string(),
            })?;

        info!(
            "Scheduled query rule {:?} applied in resource group {:?}",
            name, resource_group
        );
        data.set_id(id);

        self.read_rule(data).await
    }

    /// Fail when a rule with the same identity already exists remotely.
    async fn ensure_absent(&self, name: &str, resource_group: &str) -> ResourceResult<()> {
        match self.client.get(resource_group, name).await {
            Ok(existing) => match existing.id.filter(|id| !id.is_empty()) {
                Some(id) => Err(ResourceError::AlreadyExists {
                    resource_type: RESOURCE_TYPE.to_string(),
                    id,
                }),
                None => Ok(()),
            },
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(ResourceError::api(
                "checking for presence of existing scheduled query rule",
                name,
                resource_group,
                e,
            )),
        }
    }

    async fn read_rule(&self, data: &mut ResourceData) -> ResourceResult<()> {
        let id = RuleId::parse(data.id().unwrap_or_default())?;

        let resource = match self.client.get(&id.resource_group, &id.name).await {
            Ok(resource) => resource,
            Err(e) if e.is_not_found() => {
                debug!(
                    "Scheduled query rule {:?} was not found in resource group {:?} - removing from state",
                    id.name, id.resource_group
                );
                data.clear_id();
                return Ok(());
            }
            Err(e) => {
                return Err(ResourceError::api(
                    "retrieving scheduled query rule",
                    &id.name,
                    &id.resource_group,
                    e,
                ))
            }
        };

        let state = flatten(&id, &resource);

        if !data.params().is_empty() {
            if let Ok(declared) = RuleConfig::from_params(data.params()) {
                if !declared.is_equivalent(&state.config) {
                    debug!(
                        "Scheduled query rule {:?} (resource group {:?}) differs from its configuration",
                        id.name, id.resource_group
                    );
                }
            }
        }

        data.set_attributes(state.to_attributes());
        Ok(())
    }

    async fn delete_rule(&self, data: &mut ResourceData) -> ResourceResult<()> {
        let id = RuleId::parse(data.id().unwrap_or_default())?;

        match self.client.delete(&id.resource_group, &id.name).await {
            Ok(()) => info!(
                "Deleted scheduled query rule {:?} in resource group {:?}",
                id.name, id.resource_group
            ),
            Err(e) if e.is_not_found() => debug!(
                "Scheduled query rule {:?} in resource group {:?} was already gone",
                id.name, id.resource_group
            ),
            Err(e) => {
                return Err(ResourceError::api(
                    "deleting scheduled query rule",
                    &id.name,
                    &id.resource_group,
                    e,
                ))
            }
        }

        data.clear_id();
        Ok(())
    }
}

#[async_trait]
impl Resource for ScheduledQueryRulesResource {
    fn type_name(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> &'static BlockSchema {
        rule_schema()
    }

    fn timeouts(&self) -> &ResourceTimeouts {
        &self.timeouts
    }

    fn validate(&self, params: &ResourceParams) -> ResourceResult<()> {
        RuleConfig::from_params(params)?;
        Ok(())
    }

    async fn create(&self, data: &mut ResourceData, ctx: &ProviderContext) -> ResourceResult<()> {
        run_with_timeout(
            Phase::Create,
            &self.timeouts,
            &ctx.stop,
            self.create_or_update(data, ctx),
        )
        .await
    }

    async fn read(&self, data: &mut ResourceData, ctx: &ProviderContext) -> ResourceResult<()> {
        run_with_timeout(Phase::Read, &self.timeouts, &ctx.stop, self.read_rule(data)).await
    }

    async fn update(&self, data: &mut ResourceData, ctx: &ProviderContext) -> ResourceResult<()> {
        run_with_timeout(
            Phase::Update,
            &self.timeouts,
            &ctx.stop,
            self.create_or_update(data, ctx),
        )
        .await
    }

    async fn delete(&self, data: &mut ResourceData, ctx: &ProviderContext) -> ResourceResult<()> {
        run_with_timeout(Phase::Delete, &self.timeouts, &ctx.stop, self.delete_rule(data)).await
    }

    /// The id must name a scheduled query rule that exists.
    async fn import(&self, data: &mut ResourceData, ctx: &ProviderContext) -> ResourceResult<()> {
        let id = RuleId::parse(data.id().unwrap_or_default())?;
        self.read(data, ctx).await?;
        if data.id().is_none() {
            return Err(ResourceError::NotFound {
                name: id.name,
                resource_group: id.resource_group,
            });
        }
        Ok(())
    }

    fn requires_replace(
        &self,
        prior: &Map<String, Value>,
        planned: &ResourceParams,
    ) -> ResourceResult<Vec<&'static str>> {
        let planned: Map<String, Value> = RuleConfig::from_params(planned)?
            .to_params()
            .into_iter()
            .collect();
        Ok(force_new_changes(rule_schema(), prior, &planned))
    }

    fn has_changes(
        &self,
        prior: &Map<String, Value>,
        planned: &ResourceParams,
    ) -> ResourceResult<bool> {
        let planned = RuleConfig::from_params(planned)?;
        match RuleConfig::from_params(&configurable_params(rule_schema(), prior)) {
            Ok(prior) => Ok(!prior.is_equivalent(&planned)),
            Err(_) => Ok(true),
        }
    }
}
