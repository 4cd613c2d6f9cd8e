//! gemlayer - cached bundle install for buildpack builds
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use gemlayer::cli::{Cli, Commands, LogFormat};
use gemlayer::config::Environment;
use gemlayer::error::GemlayerResult;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> GemlayerResult<()> {
    let cli = Cli::parse();
    let env = Environment::from_env();

    // 0 = warn, 1 = info, 2+ = debug; BP_LOG_LEVEL=DEBUG forces debug
    let debug = env.as_ref().is_ok_and(|env| env.debug);
    let filter = match (cli.verbose, debug) {
        (_, true) | (2.., _) => EnvFilter::new("gemlayer=debug"),
        (1, _) => EnvFilter::new("gemlayer=info"),
        _ => EnvFilter::new("gemlayer=warn"),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    match cli.log_format {
        LogFormat::Text => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }

    let env = env?;

    match cli.command {
        Commands::Build(args) => gemlayer::cli::commands::build(args, &env).await,
        Commands::Status(args) => gemlayer::cli::commands::status(args).await,
    }
}
