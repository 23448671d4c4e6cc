// Entrypoint for the CLI application.
// - Keeps `main` small: read settings, start logging, build the API client
//   and hand it to the UI flow.
// - Any failure ends the process with exit status 1.

use anyhow::Context;
use ed_moyennes::{api::ApiClient, config::Settings, prompt::TerminalPrompter, ui};
use std::process::ExitCode;
use tracing::{metadata::LevelFilter, Level};
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};

fn init_tracing(level: Level) {
    // Logs go to stderr so they never end up inside the tables.
    let fmt = fmt::layer()
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(fmt)
        .with(LevelFilter::from_level(level))
        .init();
}

fn run() -> anyhow::Result<ExitCode> {
    let settings = Settings::from_env().context("Failed to read settings")?;
    init_tracing(settings.log_level);

    let api = ApiClient::new().context("Failed to build HTTP client")?;
    let mut prompter = TerminalPrompter;

    let status = ui::exit_status(ui::run(&api, &mut prompter, &settings))?;
    Ok(ExitCode::from(status))
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
