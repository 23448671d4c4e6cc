// Input layer: every question the tool asks goes through the `Prompter`
// trait. `TerminalPrompter` answers with `dialoguer`, tests answer with a
// scripted queue.

use crate::api::Credentials;
use crate::error::Result;
use dialoguer::{Input, Password};
use std::fmt::Display;
use std::str::FromStr;

/// Source of user answers.
pub trait Prompter {
    /// Read one line of visible text. May be empty.
    fn input(&mut self, prompt: &str) -> Result<String>;
    /// Read one line without echoing it. May be empty.
    fn password(&mut self, prompt: &str) -> Result<String>;
}

/// Prompter backed by the real terminal.
#[derive(Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn input(&mut self, prompt: &str) -> Result<String> {
        // `allow_empty` so a bare Enter selects the default.
        let value: String = Input::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?;
        Ok(value)
    }

    fn password(&mut self, prompt: &str) -> Result<String> {
        let value = Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()?;
        Ok(value)
    }
}

/// Ask for the username, then the password (masked).
pub fn prompt_credentials(prompter: &mut impl Prompter) -> Result<Credentials> {
    let username = prompter.input("Identifiant")?;
    let password = prompter.password("Mot de passe")?;
    Ok(Credentials { username, password })
}

/// Ask for a number until the answer parses and passes `accept`. An empty
/// answer returns `default` as is.
pub fn prompt_number<T>(
    prompter: &mut impl Prompter,
    text: &str,
    default: T,
    accept: impl Fn(&T) -> bool,
) -> Result<T>
where
    T: FromStr + Display,
{
    let prompt = format!("{text} (défaut : {default})");
    loop {
        let answer = prompter.input(&prompt)?;
        let answer = answer.trim();
        if answer.is_empty() {
            return Ok(default);
        }
        match answer.parse::<T>() {
            Ok(value) if accept(&value) => return Ok(value),
            _ => tracing::debug!(%answer, "rejected answer, asking again"),
        }
    }
}
