//! SPE Rotator - command-line front end.
//!
//! Lists, inspects and batch-rotates SPE exposure files between the read and
//! save directories remembered in the settings store.

use std::io;
use std::process::ExitCode;

use clap::Parser;

mod commands;
mod config;

use config::{Cli, DEFAULT_LOG_FILTER};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let stdout = io::stdout();
    match commands::run(cli, &mut stdout.lock()) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(DEFAULT_LOG_FILTER));
    if let Some(level) = cli.log_level() {
        builder.filter_level(level);
    }
    builder.init();
}
