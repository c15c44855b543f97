// ABOUTME: Entry point for the capstan CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use capstan::config::{self, Config};
use capstan::error::Result;
use capstan::output::{Output, OutputMode};
use clap::Parser;
use cli::{Cli, Commands};
use std::env;
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };
    let output = Output::new(mode);
    let cwd = env::current_dir()?;

    match cli.command {
        Commands::Init {
            app,
            deploy_dir,
            force,
        } => {
            config::init_config(&cwd, app.as_deref(), deploy_dir.as_deref(), force)?;
            output.success(&format!("Created {}", config::CONFIG_FILENAME));
            Ok(())
        }
        Commands::Deploy(args) => {
            let config = load_config(&cwd, args.destination.as_deref())?;
            commands::deploy(config, &cwd, args, output).await
        }
        Commands::Status { destination } => {
            let config = load_config(&cwd, destination.as_deref())?;
            commands::status(config, output).await
        }
    }
}

/// Discover the project config, applying destination overrides if named.
fn load_config(cwd: &Path, destination: Option<&str>) -> Result<Config> {
    let config = Config::discover(cwd)?;
    match destination {
        Some(dest) => config.for_destination(dest),
        None => Ok(config),
    }
}
