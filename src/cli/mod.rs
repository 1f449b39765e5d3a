//! Command-line host for azmon-rules
//!
//! Argument parsing, configuration loading, and subcommand dispatch.

pub mod commands;
pub mod output;
pub mod rules;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// azmon-rules - manage Azure Monitor scheduled query rules
///
/// Rules are declared in YAML or JSON files and applied to Azure Resource
/// Manager. A local state file maps each rule address to its resource id.
#[derive(Parser, Debug, Clone)]
#[command(name = "azmon-rules")]
#[command(version)]
#[command(about = "Manage Azure Monitor scheduled query rules", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Human)]
    pub output: OutputFormat,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true, env = "AZMON_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to the state file (overrides configuration)
    #[arg(long, global = true)]
    pub state: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output with colors
    #[default]
    Human,
    /// JSON output for scripting
    Json,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Check rule files without contacting Azure
    Validate(commands::validate::ValidateArgs),

    /// Print the Resource Manager request body for a rule
    Expand(commands::expand::ExpandArgs),

    /// Create or update the rules in the given files
    Apply(commands::apply::ApplyArgs),

    /// Show the live state of a rule
    Read(commands::read::ReadArgs),

    /// Start tracking an existing rule
    Import(commands::import::ImportArgs),

    /// Delete tracked rules
    Destroy(commands::destroy::DestroyArgs),

    /// Describe the rule schema
    Schema(commands::schema::SchemaArgs),
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-3)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }

    /// Check if JSON output is requested
    pub fn is_json(&self) -> bool {
        matches!(self.output, OutputFormat::Json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["azmon-rules", "apply", "rules.yaml"]).unwrap();
        assert!(matches!(cli.command, Commands::Apply(_)));
        assert!(!cli.is_json());
    }

    #[test]
    fn test_verbosity() {
        let cli = Cli::try_parse_from(["azmon-rules", "-vvvvv", "schema"]).unwrap();
        assert_eq!(cli.verbosity(), 3);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "azmon-rules",
            "validate",
            "rules.yaml",
            "--output",
            "json",
            "--state",
            "/tmp/state.json",
        ])
        .unwrap();
        assert!(cli.is_json());
        assert_eq!(cli.state, Some(PathBuf::from("/tmp/state.json")));
    }

    #[test]
    fn test_unknown_output_format() {
        assert!(Cli::try_parse_from(["azmon-rules", "--output", "xml", "schema"]).is_err());
    }
}
