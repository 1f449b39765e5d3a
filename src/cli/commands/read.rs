//! Read command - show the live state of a rule.

use super::{CommandContext, Runnable};
use crate::cli::output::ChangeStatus;
use anyhow::Result;
use azmon_rules::monitor::ScheduledQueryRulesDataSource;
use azmon_rules::provider::ResourceData;
use azmon_rules::Error;
use clap::Parser;

/// Arguments for the read command
#[derive(Parser, Debug, Clone)]
pub struct ReadArgs {
    /// Tracked rule address
    #[arg(required_unless_present = "name", conflicts_with_all = ["name", "resource_group"])]
    pub address: Option<String>,

    /// Look up an untracked rule by name
    #[arg(long, requires = "resource_group")]
    pub name: Option<String>,

    /// Resource group of the rule named by --name
    #[arg(long, short = 'g', requires = "name")]
    pub resource_group: Option<String>,
}

impl ReadArgs {
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let result = match (&self.address, &self.name, &self.resource_group) {
            (Some(address), _, _) => self.read_tracked(ctx, address).await,
            (None, Some(name), Some(resource_group)) => {
                self.lookup(ctx, name, resource_group).await
            }
            _ => anyhow::bail!("Either an address or --name and --resource-group is required"),
        };

        match result {
            Ok(code) => Ok(code),
            Err(e) => Ok(ctx.report_error(&e)),
        }
    }

    async fn read_tracked(&self, ctx: &mut CommandContext, address: &str) -> azmon_rules::Result<i32> {
        let state = ctx.state()?;
        let entry = state
            .get(address)
            .ok_or_else(|| Error::NotTracked(address.to_string()))?;
        let resource = ctx.registry()?.get(&entry.resource_type)?;

        let mut data = ResourceData::from_id(entry.id.clone());
        resource.read(&mut data, &ctx.provider_context()).await?;

        if data.id().is_none() {
            state.remove(address);
            state.persist()?;
            ctx.output.resource_result(
                address,
                ChangeStatus::Missing,
                Some("removed from state; the rule no longer exists"),
            );
            return Ok(0);
        }

        ctx.output.document(data.attributes())?;
        Ok(0)
    }

    async fn lookup(
        &self,
        ctx: &mut CommandContext,
        name: &str,
        resource_group: &str,
    ) -> azmon_rules::Result<i32> {
        let source = ScheduledQueryRulesDataSource::new(ctx.client()?)
            .with_timeouts(ctx.config.timeouts);
        let rule = source
            .read(name, resource_group, &ctx.provider_context())
            .await?;
        ctx.output.document(&rule.to_attributes())?;
        Ok(0)
    }
}

#[async_trait::async_trait]
impl Runnable for ReadArgs {
    async fn run(&self, ctx: &mut CommandContext) -> Result<i32> {
        self.execute(ctx).await
    }
}
