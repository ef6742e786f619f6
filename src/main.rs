//! viewcache - render and watch view templates from the command line.

use anyhow::Result;
use clap::{ColorChoice, Parser};
use viewcache::cli::{self, Cli, Commands};
use viewcache::logger;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = cli::load_config(&cli)?;

    match &cli.command {
        Commands::Check => cli::check(&config),
        Commands::Render { args } => cli::render(&config, args),
        Commands::Watch { args } => cli::watch(&config, args),
    }
}
