//! Import command - start tracking an existing rule.

use super::{CommandContext, Runnable};
use crate::cli::output::ChangeStatus;
use anyhow::Result;
use azmon_rules::provider::ResourceData;
use azmon_rules::Error;
use clap::Parser;

/// Arguments for the import command
#[derive(Parser, Debug, Clone)]
pub struct ImportArgs {
    /// Address to track the rule under
    pub address: String,

    /// Resource Manager id of the rule
    pub id: String,

    /// Resource type of the rule
    #[arg(long = "type", default_value = azmon_rules::monitor::RESOURCE_TYPE)]
    pub resource_type: String,
}

impl ImportArgs {
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        match self.import(ctx).await {
            Ok(()) => Ok(0),
            Err(e) => Ok(ctx.report_error(&e)),
        }
    }

    async fn import(&self, ctx: &mut CommandContext) -> azmon_rules::Result<()> {
        let state = ctx.state()?;
        if let Some(entry) = state.get(&self.address) {
            return Err(Error::AlreadyTracked {
                address: self.address.clone(),
                id: entry.id,
            });
        }

        let resource = ctx.registry()?.get(&self.resource_type)?;
        let mut data = ResourceData::from_id(self.id.clone());
        resource.import(&mut data, &ctx.provider_context()).await?;

        let id = data.id().unwrap_or(&self.id).to_string();
        state.set(&self.address, resource.type_name(), &id);
        state.persist()?;

        ctx.output
            .resource_result(&self.address, ChangeStatus::Imported, Some(&id));
        if ctx.verbosity > 0 {
            ctx.output.document(data.attributes())?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Runnable for ImportArgs {
    async fn run(&self, ctx: &mut CommandContext) -> Result<i32> {
        self.execute(ctx).await
    }
}
