//! Validate command - check rule files offline.

use super::{CommandContext, Runnable};
use crate::cli::output::{ChangeStatus, RunStats};
use crate::cli::rules::load_rule_file;
use anyhow::Result;
use azmon_rules::monitor::RuleConfig;
use azmon_rules::Error;
use clap::Parser;
use std::path::PathBuf;

/// Arguments for the validate command
#[derive(Parser, Debug, Clone)]
pub struct ValidateArgs {
    /// Rule files (YAML or JSON)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

impl ValidateArgs {
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let mut stats = RunStats::new();
        let mut exit_code = 0;

        for file in &self.files {
            let documents = match load_rule_file(file) {
                Ok(documents) => documents,
                Err(e) => {
                    stats.record(ChangeStatus::Failed);
                    exit_code = exit_code.max(ctx.report_error(&e));
                    continue;
                }
            };

            for document in documents {
                match RuleConfig::from_params(&document.params) {
                    Ok(config) => {
                        stats.record(ChangeStatus::Unchanged);
                        ctx.output.resource_result(
                            &document.address,
                            ChangeStatus::Unchanged,
                            Some(&format!("{} rule is valid", config.action_type)),
                        );
                    }
                    Err(errors) => {
                        stats.record(ChangeStatus::Failed);
                        let error = Error::Validation(errors);
                        ctx.output.resource_result(
                            &document.address,
                            ChangeStatus::Failed,
                            Some(&format!("{}: {}", document.source.display(), error)),
                        );
                        exit_code = exit_code.max(error.exit_code());
                    }
                }
            }
        }

        ctx.output.info(&format!(
            "{} valid, {} invalid",
            stats.unchanged, stats.failed
        ));
        Ok(exit_code)
    }
}

#[async_trait::async_trait]
impl Runnable for ValidateArgs {
    async fn run(&self, ctx: &mut CommandContext) -> Result<i32> {
        self.execute(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use azmon_rules::monitor::InMemoryRulesApi;

    #[test]
    fn test_validate_args_parsing() {
        let args = ValidateArgs::try_parse_from(["validate", "a.yaml", "b.json"]).unwrap();
        assert_eq!(args.files.len(), 2);
        assert!(ValidateArgs::try_parse_from(["validate"]).is_err());
    }

    #[tokio::test]
    async fn test_valid_rule() {
        let dir = tempfile::tempdir().unwrap();
        let api = InMemoryRulesApi::new("sub");
        let mut ctx = context(&dir, &api);
        let file = write_rule(&dir, "rule.yaml", RULE_YAML);

        let args = ValidateArgs { files: vec![file] };
        assert_eq!(args.run(&mut ctx).await.unwrap(), 0);
        assert_eq!(api.count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_rule() {
        let dir = tempfile::tempdir().unwrap();
        let api = InMemoryRulesApi::new("sub");
        let mut ctx = context(&dir, &api);
        let file = write_rule(
            &dir,
            "rule.yaml",
            &format!("{}frequency: 1\n", RULE_YAML.trim_start()),
        );

        let args = ValidateArgs { files: vec![file] };
        assert_eq!(args.run(&mut ctx).await.unwrap(), 4);
    }
}
