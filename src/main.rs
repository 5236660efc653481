mod api;
mod config;
mod render;
mod report;
mod steps;

use crate::api::{run, AppState, Cli};
use crate::config::ReportConfig;
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match ReportConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("invalid configuration: {}", err);
            return ExitCode::from(2);
        }
    };
    tracing_subscriber::fmt()
        .with_max_level(config.tracing_level())
        .with_writer(std::io::stderr)
        .init();
    let state = AppState::new(config);
    run(&state, cli.command)
}
