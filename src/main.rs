mod app;
mod cli;
mod clock;
mod config;
mod constants;
mod domain;
mod duration;
mod error;
mod id;
mod logging;
mod repair;
mod storage;
mod tracker;

use std::process;

use clap::Parser;
use tracing::error;

use crate::{
    cli::Cli,
    config::Settings,
    logging::{CLI_PREFIX, UI_PREFIX},
};

fn main() {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load(path),
        None => Settings::load_default(),
    };
    let data_dir = settings.resolve_data_dir(cli.data_dir.as_deref());

    let prefix = if cli.command.is_some() {
        CLI_PREFIX
    } else {
        UI_PREFIX
    };
    let level = logging::resolve_level(cli.verbose, settings.log_level.as_deref());
    // stderr belongs to the terminal UI when no subcommand is given.
    let show_std = cli.verbose && cli.command.is_some();
    if let Err(e) = logging::enable_logging(prefix, &data_dir, &level, show_std) {
        eprintln!("Warning: logging disabled: {e}");
    }

    let result = match cli.command {
        Some(command) => cli::run_command(command, &settings, &data_dir),
        None => app::run_ui(&settings, &data_dir),
    };

    if let Err(e) = result {
        error!(error = %e, "command failed");
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
