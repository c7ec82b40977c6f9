//! Stratus CLI - Satellite Imagery Metadata Core
//!
//! Command-line interface for the Stratus metadata and time
//! synchronization core.

use clap::Parser;
use env_logger::Env;
use log::info;

use stratus::cli::{commands, Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    info!("Stratus v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(cmd) => handle_command(cmd)?,
        None => {
            println!("Stratus v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
        }
    }

    Ok(())
}

fn handle_command(cmd: Commands) -> stratus::Result<()> {
    match cmd {
        Commands::Inspect { catalog } => commands::inspect(&catalog),
        Commands::Play {
            catalog,
            steps,
            backwards,
            timebase,
            matcher,
        } => commands::play(&catalog, steps, backwards, timebase.as_ref(), matcher),
        Commands::Scan { dir } => commands::scan(&dir),
    }
}
