mod commands;
mod summary;

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "bbired", about = "Broad-band imaging reduction for OSIRIS frames")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reduce one observation block
    Run(commands::run::RunArgs),
    /// Classify the raw frames of a directory
    Inventory(commands::inventory::InventoryArgs),
    /// Show FITS header metadata
    Info(commands::info::InfoArgs),
    /// Print or save the default configuration
    Config(commands::config::ConfigArgs),
}

fn level_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    }
}

/// stderr logging, plus a plain-text copy in `log_file` when given.
fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(level_filter(verbose));

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(level_filter(verbose)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Run(args) => {
            let prepared = commands::run::prepare(args)?;
            init_logging(cli.verbose, prepared.log_file.as_deref())?;
            commands::run::run(prepared)
        }
        Commands::Inventory(args) => {
            init_logging(cli.verbose, None)?;
            commands::inventory::run(args)
        }
        Commands::Info(args) => {
            init_logging(cli.verbose, None)?;
            commands::info::run(args)
        }
        Commands::Config(args) => commands::config::run(args),
    }
}
