// Error type shared by every stage of the flow. Authentication and fetch
// failures carry the message sent back by EcoleDirecte so the UI can show it
// as is.

/// Everything that can stop a run.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The login response carried no usable token.
    #[error("{0}")]
    Authentication(String),
    /// The grades response carried a status code other than 200.
    #[error("{message} (code {code})")]
    Fetch { code: i64, message: String },
    /// A response did not match the expected JSON schema.
    #[error("Unexpected response from EcoleDirecte: {0}")]
    Protocol(String),
    /// The request never got a response.
    #[error("Request to EcoleDirecte failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// A score or coefficient could not be read as a number.
    #[error("`{0}` is not a valid number")]
    InvalidNumber(String),
    /// The account has no grade at all, so there is no period to pick.
    #[error("No grades found, there is no period to choose from.")]
    NoPeriods,
    /// Reading from the terminal failed.
    #[error("Could not read input: {0}")]
    Prompt(#[from] std::io::Error),
    /// An environment variable held an unusable value.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Whether the error was already shown to the user by the UI (failed
    /// spinner) and only needs the exit status.
    pub fn is_reported(&self) -> bool {
        matches!(self, Error::Authentication(_) | Error::Fetch { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Protocol(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
