// Library root
// -----------
// This crate exposes the pieces of the EcoleDirecte averages tool. The
// binary (`main.rs`) only sets up logging and configuration, then hands
// over to `ui::run`.
//
// Module responsibilities:
// - `api`: HTTP calls to EcoleDirecte (login, grades) and response schemas.
// - `grades`: grade records, period discovery and average computation.
// - `prompt`: the `Prompter` input seam and the generic number prompt.
// - `ui`: the interactive flow, spinners and result tables.
// - `config`: defaults read from the environment.
// - `error`: the crate error type.
pub mod api;
pub mod config;
pub mod error;
pub mod grades;
pub mod prompt;
pub mod ui;

pub use error::{Error, Result};
