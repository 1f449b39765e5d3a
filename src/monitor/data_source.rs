//! Read-only lookup of an existing scheduled query rule.

use super::client::ScheduledQueryRulesApi;
use super::flatten::flatten;
use super::rule::{RuleId, RuleState};
use crate::provider::{
    run_with_timeout, Phase, ProviderContext, ResourceError, ResourceResult, ResourceTimeouts,
};
use std::sync::Arc;
use tracing::debug;

/// Looks up a rule by name and resource group.
///
/// Unlike the resource's read, a missing rule is an error here.
pub struct ScheduledQueryRulesDataSource {
    client: Arc<dyn ScheduledQueryRulesApi>,
    timeouts: ResourceTimeouts,
}

impl ScheduledQueryRulesDataSource {
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

    pub async fn read(
        &self,
        name: &str,
        resource_group: &str,
        ctx: &ProviderContext,
    ) -> ResourceResult<RuleState> {
        run_with_timeout(Phase::Read, &self.timeouts, &ctx.stop, async {
            debug!(
                "Looking up scheduled query rule {:?} in resource group {:?}",
                name, resource_group
            );

            let resource = match self.client.get(resource_group, name).await {
                Ok(resource) => resource,
                Err(e) if e.is_not_found() => {
                    return Err(ResourceError::NotFound {
                        name: name.to_string(),
                        resource_group: resource_group.to_string(),
                    })
                }
                Err(e) => {
                    return Err(ResourceError::api(
                        "retrieving scheduled query rule",
                        name,
                        resource_group,
                        e,
                    ))
                }
            };

            let id = match resource.id.as_deref().map(RuleId::parse) {
                Some(Ok(id)) => id,
                _ => RuleId::new(self.client.subscription_id(), resource_group, name),
            };
            Ok(flatten(&id, &resource))
        })
        .await
    }
}
