//! azmon-rules - manage Azure Monitor scheduled query rules
//!
//! This is the main entry point for the azmon-rules CLI.

mod cli;

use anyhow::Result;
use azmon_rules::config::Config;
use azmon_rules::telemetry::init_logging;
use cli::commands::{CommandContext, Runnable};
use cli::{Cli, Commands};
use tracing::debug;

/// Application version information
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            e.downcast_ref::<azmon_rules::Error>()
                .map_or(1, azmon_rules::Error::exit_code)
        }
    };

    std::process::exit(exit_code);
}

async fn run(cli: Cli) -> Result<i32> {
    let config = Config::load(cli.config.as_ref())?;

    let mut logging = config.logging.clone().with_verbosity(cli.verbosity());
    if cli.no_color {
        logging.ansi_colors = false;
    }
    init_logging(logging)?;
    debug!("azmon-rules v{}", VERSION);

    let mut ctx = CommandContext::new(&cli, config);

    let stop = ctx.stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.cancel();
        }
    });

    let command: &(dyn Runnable + Sync) = match &cli.command {
        Commands::Validate(args) => args,
        Commands::Expand(args) => args,
        Commands::Apply(args) => args,
        Commands::Read(args) => args,
        Commands::Import(args) => args,
        Commands::Destroy(args) => args,
        Commands::Schema(args) => args,
    };
    let exit_code = command.run(&mut ctx).await?;

    ctx.output.flush();
    Ok(exit_code)
}
