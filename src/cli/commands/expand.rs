//! Expand command - print the request body a rule would send.

use super::{CommandContext, Runnable};
use crate::cli::rules::{load_rule_file, RuleDocument};
use anyhow::{bail, Result};
use azmon_rules::monitor::{expand, RuleConfig};
use clap::Parser;
use std::path::PathBuf;

/// Arguments for the expand command
#[derive(Parser, Debug, Clone)]
pub struct ExpandArgs {
    /// Rule file (YAML or JSON)
    pub file: PathBuf,

    /// Address of the rule when the file holds several
    #[arg(long, short = 'a')]
    pub address: Option<String>,
}

impl ExpandArgs {
    fn select(&self, documents: Vec<RuleDocument>) -> Result<RuleDocument> {
        match &self.address {
            Some(address) => documents
                .into_iter()
                .find(|d| &d.address == address)
                .ok_or_else(|| anyhow::anyhow!("No rule with address '{}' in {}", address, self.file.display())),
            None => match <[RuleDocument; 1]>::try_from(documents) {
                Ok([document]) => Ok(document),
                Err(documents) if documents.is_empty() => {
                    bail!("{} holds no rules", self.file.display())
                }
                Err(documents) => {
                    let addresses: Vec<String> = documents.into_iter().map(|d| d.address).collect();
                    bail!(
                        "{} holds several rules ({}); pick one with --address",
                        self.file.display(),
                        addresses.join(", ")
                    )
                }
            },
        }
    }

    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let document = self.select(load_rule_file(&self.file)?)?;

        let config = match RuleConfig::from_params(&document.params) {
            Ok(config) => config,
            Err(errors) => return Ok(ctx.report_error(&errors.into())),
        };

        ctx.output.debug(&format!("Expanding rule '{}'", document.address));
        ctx.output.document(&expand(&config))?;
        Ok(0)
    }
}

#[async_trait::async_trait]
impl Runnable for ExpandArgs {
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
    fn test_expand_args_parsing() {
        let args = ExpandArgs::try_parse_from(["expand", "rules.yaml", "-a", "cpu"]).unwrap();
        assert_eq!(args.address.as_deref(), Some("cpu"));
    }

    #[tokio::test]
    async fn test_expand_requires_address_for_many_rules() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(&dir, &InMemoryRulesApi::new("sub"));
        let file = write_rule(&dir, "rules.yaml", "rules:\n  a:\n    name: a\n  b:\n    name: b\n");

        let args = ExpandArgs {
            file,
            address: None,
        };
        let err = args.run(&mut ctx).await.unwrap_err();
        assert!(err.to_string().contains("pick one with --address"));
    }

    #[tokio::test]
    async fn test_expand_single_rule() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(&dir, &InMemoryRulesApi::new("sub"));
        let file = write_rule(&dir, "rule.yaml", RULE_YAML);

        let args = ExpandArgs {
            file,
            address: None,
        };
        assert_eq!(args.run(&mut ctx).await.unwrap(), 0);
    }
}
