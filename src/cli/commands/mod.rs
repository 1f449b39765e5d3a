//! Subcommand implementations.

pub mod apply;
pub mod destroy;
pub mod expand;
pub mod import;
pub mod read;
pub mod schema;
pub mod validate;

use crate::cli::output::OutputFormatter;
use anyhow::Result;
use azmon_rules::config::Config;
use azmon_rules::monitor::{ScheduledQueryRulesApi, ScheduledQueryRulesClient};
use azmon_rules::provider::{ProviderContext, ResourceRegistry};
use azmon_rules::state::StateManager;
use azmon_rules::Error;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Common context shared between commands
pub struct CommandContext {
    /// Configuration
    pub config: Config,
    /// Output formatter
    pub output: OutputFormatter,
    /// Verbosity level
    pub verbosity: u8,
    /// State file location
    pub state_path: PathBuf,
    /// Cancelled on Ctrl-C
    pub stop: CancellationToken,
    client: Option<Arc<dyn ScheduledQueryRulesApi>>,
}

impl CommandContext {
    /// Create a new command context from CLI arguments
    pub fn new(cli: &crate::cli::Cli, config: Config) -> Self {
        let output = OutputFormatter::new(!cli.no_color, cli.is_json(), cli.verbosity());
        let state_path = cli
            .state
            .clone()
            .unwrap_or_else(|| config.state.path.clone());

        Self {
            config,
            output,
            verbosity: cli.verbosity(),
            state_path,
            stop: CancellationToken::new(),
            client: None,
        }
    }

    /// Use `client` instead of building one from configuration.
    #[cfg(test)]
    pub fn with_client(mut self, client: Arc<dyn ScheduledQueryRulesApi>) -> Self {
        self.client = Some(client);
        self
    }

    /// The Resource Manager client, built on first use.
    pub fn client(&mut self) -> azmon_rules::Result<Arc<dyn ScheduledQueryRulesApi>> {
        if let Some(client) = &self.client {
            return Ok(Arc::clone(client));
        }

        if self.config.subscription_id().is_err() {
            return Err(Error::invalid_config(
                "azure.subscription_id",
                "not set; export ARM_SUBSCRIPTION_ID or add it to the [azure] section",
            ));
        }
        if self.config.azure.access_token.is_none() {
            self.output
                .warning("No access token configured; requests will be sent unauthenticated");
        }

        let client: Arc<dyn ScheduledQueryRulesApi> =
            Arc::new(ScheduledQueryRulesClient::new(&self.config.azure)?);
        self.client = Some(Arc::clone(&client));
        Ok(client)
    }

    /// Registry of resource types bound to the client.
    pub fn registry(&mut self) -> azmon_rules::Result<ResourceRegistry> {
        let client = self.client()?;
        Ok(ResourceRegistry::with_builtins(client, self.config.timeouts))
    }

    pub fn provider_context(&self) -> ProviderContext {
        ProviderContext::new(self.config.features).with_stop(self.stop.clone())
    }

    pub fn state(&self) -> azmon_rules::Result<StateManager> {
        self.output
            .debug(&format!("Using state file {}", self.state_path.display()));
        Ok(StateManager::json(&self.state_path)?)
    }

    /// Report a failed item and return its exit code.
    pub fn report_error(&self, error: &Error) -> i32 {
        self.output.error(&error.to_string());
        if let Error::ReplacementRequired { .. } = error {
            self.output
                .hint("Replacing deletes the existing rule before creating the new one");
        }
        error.exit_code()
    }
}

/// Trait for runnable commands
#[async_trait::async_trait]
pub trait Runnable {
    /// Execute the command
    async fn run(&self, ctx: &mut CommandContext) -> Result<i32>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::cli::Cli;
    use azmon_rules::monitor::InMemoryRulesApi;
    use clap::Parser;

    pub const RULE_YAML: &str = r#"
name: requests
resource_group_name: rg1
location: West Europe
data_source_id: /subscriptions/sub/resourceGroups/rg1/providers/Microsoft.Insights/components/ai
criteria:
  - metric_name: requests
    dimension:
      - name: cloud_RoleName
        operator: Include
        values: [api]
"#;

    pub fn context(dir: &tempfile::TempDir, api: &InMemoryRulesApi) -> CommandContext {
        let state = dir.path().join("state.json");
        let cli = Cli::try_parse_from([
            "azmon-rules",
            "--no-color",
            "--state",
            state.to_str().unwrap(),
            "schema",
        ])
        .unwrap();
        CommandContext::new(&cli, Config::default()).with_client(Arc::new(api.clone()))
    }

    pub fn write_rule(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    pub const RULE_ID: &str =
        "/subscriptions/sub/resourceGroups/rg1/providers/Microsoft.Insights/scheduledQueryRules/requests";
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use azmon_rules::monitor::InMemoryRulesApi;

    #[test]
    fn test_state_path_from_flag() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir, &InMemoryRulesApi::new("sub"));
        assert_eq!(ctx.state_path, dir.path().join("state.json"));
    }

    #[test]
    fn test_client_requires_subscription() {
        let cli = <crate::cli::Cli as clap::Parser>::try_parse_from(["azmon-rules", "schema"]).unwrap();
        let mut ctx = CommandContext::new(&cli, Config::default());
        let err = ctx.client().err().unwrap();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }
}
