// Runtime settings read from the environment. Only the prompt defaults and
// the log level can be changed; the API location is fixed.

use crate::error::{Error, Result};
use std::str::FromStr;
use tracing::Level;

/// Default denominator averages are projected onto.
pub const DEFAULT_OVER: f64 = 20.0;
/// Default number of decimals shown.
pub const DEFAULT_PRECISION: usize = 2;

/// Settings for a single run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub default_over: f64,
    pub default_precision: usize,
    pub log_level: Level,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            default_over: DEFAULT_OVER,
            default_precision: DEFAULT_PRECISION,
            log_level: Level::WARN,
        }
    }
}

impl Settings {
    /// Build settings from `ED_MOYENNES_OVER`, `ED_MOYENNES_PRECISION` and
    /// `ED_MOYENNES_LOG`, falling back to the defaults for unset variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Settings::default();
        let default_over = parse_var(&lookup, "ED_MOYENNES_OVER", defaults.default_over)?;
        if !default_over.is_finite() {
            return Err(Error::Config(format!(
                "ED_MOYENNES_OVER must be a finite number, got {default_over}"
            )));
        }
        Ok(Settings {
            default_over,
            default_precision: parse_var(
                &lookup,
                "ED_MOYENNES_PRECISION",
                defaults.default_precision,
            )?,
            log_level: parse_var(&lookup, "ED_MOYENNES_LOG", defaults.log_level)?,
        })
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T> {
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{key}={raw} could not be parsed"))),
        _ => Ok(default),
    }
}
