//! Destroy command - delete tracked rules.

use super::{CommandContext, Runnable};
use crate::cli::output::{ChangeStatus, RunStats};
use anyhow::{bail, Result};
use azmon_rules::provider::ResourceData;
use azmon_rules::state::StateManager;
use azmon_rules::Error;
use clap::Parser;

/// Arguments for the destroy command
#[derive(Parser, Debug, Clone)]
pub struct DestroyArgs {
    /// Addresses to delete
    pub addresses: Vec<String>,

    /// Delete every tracked rule
    #[arg(long, conflicts_with = "addresses")]
    pub all: bool,
}

impl DestroyArgs {
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        if self.addresses.is_empty() && !self.all {
            bail!("Name the addresses to destroy or pass --all");
        }

        let state = ctx.state()?;
        let addresses = if self.all {
            state.addresses()
        } else {
            self.addresses.clone()
        };

        let mut stats = RunStats::new();
        let mut first_error = None;

        for address in &addresses {
            match self.destroy(ctx, &state, address).await {
                Ok(()) => {
                    stats.record(ChangeStatus::Deleted);
                    ctx.output
                        .resource_result(address, ChangeStatus::Deleted, None);
                }
                Err(e) => {
                    stats.record(ChangeStatus::Failed);
                    ctx.output
                        .resource_result(address, ChangeStatus::Failed, None);
                    let code = ctx.report_error(&e);
                    first_error.get_or_insert(code);
                }
            }
        }

        ctx.output.summary(&stats);
        if stats.has_failures() {
            Ok(first_error.unwrap_or(1))
        } else {
            Ok(0)
        }
    }

    async fn destroy(
        &self,
        ctx: &mut CommandContext,
        state: &StateManager,
        address: &str,
    ) -> azmon_rules::Result<()> {
        let entry = state
            .get(address)
            .ok_or_else(|| Error::NotTracked(address.to_string()))?;
        let resource = ctx.registry()?.get(&entry.resource_type)?;

        let mut data = ResourceData::from_id(entry.id);
        resource.delete(&mut data, &ctx.provider_context()).await?;

        state.remove(address);
        state.persist()?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Runnable for DestroyArgs {
    async fn run(&self, ctx: &mut CommandContext) -> Result<i32> {
        self.execute(ctx).await
    }
}
