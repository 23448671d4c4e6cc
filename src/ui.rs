// UI layer: runs the whole session from login to the averages table.
// Network calls go through `Portal` and questions through `Prompter`, so
// the same flow runs in the terminal and in tests.

use crate::api::Portal;
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::grades::{self, AverageReport, GradeRecord};
use crate::prompt::{self, Prompter};
use crossterm::style::Stylize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tabled::settings::Style;
use tabled::{Table, Tabled};

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;

/// Largest precision accepted at the prompt.
pub const MAX_PRECISION: usize = 20;

/// Log in, fetch grades, ask for the period and options, then print the
/// averages table. Returns the report that was printed.
pub fn run(
    portal: &impl Portal,
    prompter: &mut impl Prompter,
    settings: &Settings,
) -> Result<AverageReport> {
    let credentials = prompt::prompt_credentials(prompter)?;

    let spinner = start_spinner("Connexion à EcoleDirecte ...");
    let session = match portal.login(&credentials) {
        Ok(session) => session,
        Err(e) => return Err(fail(&spinner, e, "Connexion à EcoleDirecte impossible")),
    };
    drop(credentials);
    succeed(
        &spinner,
        &format!("Connecté à EcoleDirecte - {}", session.display_name),
    );

    let spinner = start_spinner("Récupération des notes ...");
    let records = match portal.fetch_grades(&session) {
        Ok(records) => records,
        Err(e) => return Err(fail(&spinner, e, "Impossible de récupérer les notes")),
    };
    succeed(&spinner, "Les notes ont été récupérées avec succès");

    let period = select_period(prompter, &records)?;
    let over = prompt::prompt_number(
        prompter,
        "Sur combien voulez-vous obtenir les moyennes ?",
        settings.default_over,
        |v: &f64| v.is_finite(),
    )?;
    let precision = prompt::prompt_number(
        prompter,
        "Veuillez entrer une précision (nombre de chiffres après la virgule) :",
        settings.default_precision,
        |p: &usize| *p <= MAX_PRECISION,
    )?;

    let report = grades::compute_averages(&records, &period, over, precision)?;
    println!("{}", render_averages(&report));
    Ok(report)
}

/// Row of the periods table.
#[derive(Tabled)]
struct PeriodRow<'a> {
    #[tabled(rename = "Index")]
    index: usize,
    #[tabled(rename = "Période")]
    code: &'a str,
}

/// Show the periods found in `records` and ask which one to average. The
/// last period, usually the current one, is the default.
pub fn select_period(prompter: &mut impl Prompter, records: &[GradeRecord]) -> Result<String> {
    let mut periods = grades::available_periods(records);
    if periods.is_empty() {
        return Err(Error::NoPeriods);
    }
    println!("{}", render_periods(&periods));

    let count = periods.len();
    let index = prompt::prompt_number(
        prompter,
        "Index de la période (semestre, trimestre, etc.) dont vous voulez obtenir les moyennes :",
        count - 1,
        |i: &usize| *i < count,
    )?;
    tracing::debug!(index, period = %periods[index], "period selected");
    Ok(periods.swap_remove(index))
}

/// Periods table, one row per index.
pub fn render_periods(periods: &[String]) -> String {
    let rows = periods.iter().enumerate().map(|(index, code)| PeriodRow {
        index,
        code: code.as_str(),
    });
    Table::new(rows).with(Style::modern()).to_string()
}

/// Two-column table of the ranked averages, overall average last.
pub fn render_averages(report: &AverageReport) -> String {
    Table::new(report.ranked()).with(Style::modern()).to_string()
}

fn start_spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

fn message_only() -> ProgressStyle {
    ProgressStyle::with_template("{msg}").unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn succeed(spinner: &ProgressBar, message: &str) {
    spinner.set_style(message_only());
    spinner.finish_with_message(format!("{} {}", "✔".green(), message));
}

/// Mark the spinner as failed and hand the error back. Server messages are
/// shown as is; other errors only get `summary`, their details are printed
/// once by the caller.
fn fail(spinner: &ProgressBar, err: Error, summary: &str) -> Error {
    spinner.set_style(message_only());
    let message = if err.is_reported() {
        err.to_string()
    } else {
        summary.to_string()
    };
    spinner.finish_with_message(format!("{} {}", "✖".red(), message));
    err
}

/// Process exit status for the outcome of `run`: 0 on success, 1 when the
/// failure was already shown on a spinner. Other errors are handed back so
/// the caller can print them before exiting with 1.
pub fn exit_status(outcome: Result<AverageReport>) -> Result<u8> {
    match outcome {
        Ok(_) => Ok(EXIT_SUCCESS),
        Err(e) if e.is_reported() => Ok(EXIT_FAILURE),
        Err(e) => Err(e),
    }
}
