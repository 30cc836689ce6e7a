//! Streamscout CLI - Command-line interface
//!
//! Runs searches and source lookups against the built-in demo providers.

mod commands;
mod tracing_setup;

use std::path::PathBuf;

use clap::Parser;
use tracing_setup::CliLogLevel;

#[derive(Parser)]
#[command(name = "streamscout")]
#[command(about = "Search streaming providers and rank their sources")]
struct Cli {
    /// Console log level
    #[arg(long, global = true, default_value = "warn")]
    log_level: CliLogLevel,

    /// Shorthand for `--log-level debug`
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write a full trace log into this directory
    #[arg(long, global = true)]
    logs_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        CliLogLevel::Debug
    } else {
        cli.log_level
    };
    tracing_setup::init_tracing(level.as_tracing_level(), cli.logs_dir.as_deref())?;

    commands::handle_command(cli.command).await
}
