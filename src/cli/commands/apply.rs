//! Apply command - create or update declared rules.
//!
//! For each rule address:
//!
//! - not tracked: create (refused if the rule already exists and imports
//!   are required)
//! - tracked but gone remotely: create again
//! - tracked and a replace-only field changed: delete then create, only
//!   with `--replace`
//! - tracked and otherwise changed: update in place
//!
//! State is written after every successful change so an interrupted run
//! never loses an id.

use super::{CommandContext, Runnable};
use crate::cli::output::{ChangeStatus, RunStats};
use crate::cli::rules::{load_rule_files, RuleDocument};
use anyhow::Result;
use azmon_rules::monitor::RESOURCE_TYPE;
use azmon_rules::provider::{ProviderContext, Resource, ResourceData};
use azmon_rules::state::StateManager;
use azmon_rules::Error;
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Arguments for the apply command
#[derive(Parser, Debug, Clone)]
pub struct ApplyArgs {
    /// Rule files (YAML or JSON)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Allow delete-and-create when a replace-only field changed
    #[arg(long)]
    pub replace: bool,
}

impl ApplyArgs {
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let documents = load_rule_files(&self.files)?;
        let registry = ctx.registry()?;
        let resource = registry.get(RESOURCE_TYPE)?;
        let state = ctx.state()?;
        let provider = ctx.provider_context();

        let mut stats = RunStats::new();
        let mut first_error = None;

        for document in &documents {
            match self
                .apply_rule(resource.as_ref(), &state, &provider, document)
                .await
            {
                Ok(status) => {
                    stats.record(status);
                    ctx.output.resource_result(&document.address, status, None);
                }
                Err(e) => {
                    stats.record(ChangeStatus::Failed);
                    let source = format!("declared in {}", document.source.display());
                    ctx.output
                        .resource_result(&document.address, ChangeStatus::Failed, Some(&source));
                    let code = ctx.report_error(&e);
                    first_error.get_or_insert(code);
                }
            }

            if provider.stop.is_cancelled() {
                ctx.output.warning("Interrupted; remaining rules were not applied");
                break;
            }
        }

        ctx.output.summary(&stats);
        if stats.has_failures() {
            Ok(first_error.unwrap_or(1))
        } else {
            Ok(0)
        }
    }

    async fn apply_rule(
        &self,
        resource: &dyn Resource,
        state: &StateManager,
        provider: &ProviderContext,
        document: &RuleDocument,
    ) -> azmon_rules::Result<ChangeStatus> {
        resource.validate(&document.params)?;

        if let Some(id) = state.id(&document.address) {
            let mut data = ResourceData::existing(id, document.params.clone());
            resource.read(&mut data, provider).await?;

            if data.id().is_some() {
                return self
                    .converge(resource, state, provider, document, data)
                    .await;
            }

            warn!(
                "Rule '{}' is tracked but no longer exists; creating it again",
                document.address
            );
        }

        let mut data = ResourceData::new(document.params.clone());
        resource.create(&mut data, provider).await?;
        record(state, resource, &document.address, &data)?;
        Ok(ChangeStatus::Created)
    }

    /// Bring an existing rule in line with its declaration.
    async fn converge(
        &self,
        resource: &dyn Resource,
        state: &StateManager,
        provider: &ProviderContext,
        document: &RuleDocument,
        mut data: ResourceData,
    ) -> azmon_rules::Result<ChangeStatus> {
        let replace_fields = resource.requires_replace(data.attributes(), &document.params)?;

        if !replace_fields.is_empty() {
            if !self.replace {
                return Err(Error::ReplacementRequired {
                    address: document.address.clone(),
                    fields: replace_fields.join(", "),
                });
            }

            debug!(
                "Replacing '{}' because {} changed",
                document.address,
                replace_fields.join(", ")
            );
            resource.delete(&mut data, provider).await?;
            state.remove(&document.address);
            state.persist()?;

            let mut fresh = ResourceData::new(document.params.clone());
            resource.create(&mut fresh, provider).await?;
            record(state, resource, &document.address, &fresh)?;
            return Ok(ChangeStatus::Replaced);
        }

        if !resource.has_changes(data.attributes(), &document.params)? {
            return Ok(ChangeStatus::Unchanged);
        }

        resource.update(&mut data, provider).await?;
        record(state, resource, &document.address, &data)?;
        Ok(ChangeStatus::Updated)
    }
}

/// Store the id a handler left in `data`.
fn record(
    state: &StateManager,
    resource: &dyn Resource,
    address: &str,
    data: &ResourceData,
) -> azmon_rules::Result<()> {
    let id = data.id().ok_or_else(|| Error::Other {
        message: format!("'{}' has no id after apply", address),
        source: None,
    })?;
    state.set(address, resource.type_name(), id);
    state.persist()?;
    Ok(())
}

#[async_trait::async_trait]
impl Runnable for ApplyArgs {
    async fn run(&self, ctx: &mut CommandContext) -> Result<i32> {
        self.execute(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use azmon_rules::monitor::memory::Operation;
    use azmon_rules::monitor::InMemoryRulesApi;
    use pretty_assertions::assert_eq;

    fn apply(file: PathBuf, replace: bool) -> ApplyArgs {
        ApplyArgs {
            files: vec![file],
            replace,
        }
    }

    #[test]
    fn test_apply_args_parsing() {
        let args = ApplyArgs::try_parse_from(["apply", "rules.yaml", "--replace"]).unwrap();
        assert!(args.replace);
        assert_eq!(args.files, vec![PathBuf::from("rules.yaml")]);
    }

    #[tokio::test]
    async fn test_create_then_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let api = InMemoryRulesApi::new("sub");
        let mut ctx = context(&dir, &api);
        let file = write_rule(&dir, "rule.yaml", RULE_YAML);

        assert_eq!(apply(file.clone(), false).run(&mut ctx).await.unwrap(), 0);
        assert!(api.contains("rg1", "requests"));
        assert_eq!(ctx.state().unwrap().id("requests").as_deref(), Some(RULE_ID));

        assert_eq!(apply(file, false).run(&mut ctx).await.unwrap(), 0);
        assert_eq!(api.calls(Operation::CreateOrUpdate), 1);
    }

    #[tokio::test]
    async fn test_untracked_existing_rule_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let api = InMemoryRulesApi::new("sub");
        let file = write_rule(&dir, "rule.yaml", RULE_YAML);

        let mut first = context(&dir, &api);
        apply(file.clone(), false).run(&mut first).await.unwrap();
        std::fs::remove_file(dir.path().join("state.json")).unwrap();

        let mut ctx = context(&dir, &api);
        assert_eq!(apply(file, false).run(&mut ctx).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_update_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let api = InMemoryRulesApi::new("sub");
        let mut ctx = context(&dir, &api);
        let file = write_rule(&dir, "rule.yaml", RULE_YAML);
        apply(file.clone(), false).run(&mut ctx).await.unwrap();

        std::fs::write(&file, format!("{}description: changed\n", RULE_YAML.trim_start())).unwrap();
        assert_eq!(apply(file, false).run(&mut ctx).await.unwrap(), 0);

        let stored = api.stored("rg1", "requests").unwrap();
        assert_eq!(stored.properties.description.as_deref(), Some("changed"));
        assert_eq!(api.calls(Operation::CreateOrUpdate), 2);
    }

    #[tokio::test]
    async fn test_replace_requires_flag() {
        let dir = tempfile::tempdir().unwrap();
        let api = InMemoryRulesApi::new("sub");
        let mut ctx = context(&dir, &api);
        let file = write_rule(&dir, "rule.yaml", RULE_YAML);
        apply(file.clone(), false).run(&mut ctx).await.unwrap();

        std::fs::write(&file, RULE_YAML.replace("West Europe", "North Europe")).unwrap();
        assert_eq!(apply(file.clone(), false).run(&mut ctx).await.unwrap(), 6);
        assert_eq!(api.calls(Operation::Delete), 0);

        assert_eq!(apply(file, true).run(&mut ctx).await.unwrap(), 0);
        assert_eq!(api.calls(Operation::Delete), 1);
        assert_eq!(
            api.stored("rg1", "requests").unwrap().location,
            "northeurope"
        );
    }

    #[tokio::test]
    async fn test_recreate_when_deleted_out_of_band() {
        let dir = tempfile::tempdir().unwrap();
        let api = InMemoryRulesApi::new("sub");
        let mut ctx = context(&dir, &api);
        let file = write_rule(&dir, "rule.yaml", RULE_YAML);
        apply(file.clone(), false).run(&mut ctx).await.unwrap();

        api.remove("rg1", "requests");
        assert_eq!(apply(file, false).run(&mut ctx).await.unwrap(), 0);
        assert!(api.contains("rg1", "requests"));
    }

    #[tokio::test]
    async fn test_failed_rule_sets_exit_code_and_others_still_apply() {
        let dir = tempfile::tempdir().unwrap();
        let api = InMemoryRulesApi::new("sub");
        let mut ctx = context(&dir, &api);
        let good = RULE_YAML.trim_start().replace('\n', "\n    ");
        let bad = good.replace("name: requests", "name: broken") + "severity: 1\n";
        let file = write_rule(
            &dir,
            "rules.yaml",
            &format!("rules:\n  a-broken:\n    {}\n  b-requests:\n    {}\n", bad.trim_end(), good.trim_end()),
        );

        assert_eq!(apply(file, false).run(&mut ctx).await.unwrap(), 4);
        assert!(api.contains("rg1", "requests"));
        assert!(!api.contains("rg1", "broken"));
        assert_eq!(ctx.state().unwrap().id("a-broken"), None);
    }
}
