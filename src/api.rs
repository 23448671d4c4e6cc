// API client module: a small blocking HTTP client for the two EcoleDirecte
// endpoints the tool needs (login and grades). Response bodies are decoded
// into explicit schemas by pure functions so they can be tested without a
// network.

use crate::error::{Error, Result};
use crate::grades::GradeRecord;
use reqwest::blocking::Client;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

/// Root of the EcoleDirecte v3 API.
pub const BASE_URL: &str = "https://api.ecoledirecte.com/v3";

/// EcoleDirecte refuses the usual library user agents, so every request
/// identifies itself with this one.
pub const USER_AGENT: &str = "ed-moyennes/0.1 (calcul de moyennes EcoleDirecte)";

/// Status code the grades endpoint reports on success.
pub const SUCCESS_CODE: i64 = 200;

/// Login payload. Only lives for the duration of the login call.
#[derive(Serialize, Clone, PartialEq, Eq)]
pub struct Credentials {
    #[serde(rename = "identifiant")]
    pub username: String,
    #[serde(rename = "motdepasse")]
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// An authenticated session, used once to fetch the grades.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub student_id: String,
    pub display_name: String,
}

/// Raw login response. `data` stays untyped until the token has been
/// checked because failed logins do not always send the accounts object.
#[derive(Deserialize, Debug)]
struct LoginResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

#[derive(Deserialize, Debug)]
struct LoginData {
    accounts: Vec<Account>,
}

/// The account id comes back as a number, but a string is accepted too.
#[derive(Deserialize, Debug)]
struct Account {
    nom: String,
    prenom: String,
    id: serde_json::Value,
}

#[derive(Serialize)]
struct TokenPayload<'a> {
    token: &'a str,
}

#[derive(Deserialize, Debug)]
struct GradesResponse {
    code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

#[derive(Deserialize, Debug)]
struct GradesData {
    notes: Vec<GradeRecord>,
}

/// Remote source of sessions and grades. The flow in `ui` only talks to
/// this trait so it can run against fixtures.
pub trait Portal {
    /// Authenticate and open a session.
    fn login(&self, credentials: &Credentials) -> Result<Session>;
    /// Fetch every grade record of the session's student.
    fn fetch_grades(&self, session: &Session) -> Result<Vec<GradeRecord>>;
}

/// Blocking client for the EcoleDirecte API.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
}

impl ApiClient {
    /// Build a client that sends the custom user agent on every request.
    pub fn new() -> Result<Self> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(ApiClient { client })
    }

    /// POST `data=<json>` and return the raw response body. The body is not
    /// url-encoded: the API reads the JSON right after `data=`.
    fn post_data<T: Serialize>(&self, url: &str, payload: &T) -> Result<String> {
        tracing::debug!(%url, "sending request");
        let res = self
            .client
            .post(url)
            .header(
                CONTENT_TYPE,
                HeaderValue::from_static("text/plain;charset=UTF-8"),
            )
            .body(encode_body(payload)?)
            .send()?;
        tracing::debug!(status = %res.status(), "response received");
        Ok(res.text()?)
    }
}

impl Portal for ApiClient {
    fn login(&self, credentials: &Credentials) -> Result<Session> {
        let url = format!("{BASE_URL}/login.awp");
        let body = self.post_data(&url, credentials)?;
        let session = parse_login_response(&body)?;
        tracing::info!(student_id = %session.student_id, "logged in");
        Ok(session)
    }

    fn fetch_grades(&self, session: &Session) -> Result<Vec<GradeRecord>> {
        let url = grades_url(&session.student_id);
        let body = self.post_data(
            &url,
            &TokenPayload {
                token: &session.token,
            },
        )?;
        let records = parse_grades_response(&body)?;
        tracing::info!(count = records.len(), "grades fetched");
        Ok(records)
    }
}

/// Form body expected by every endpoint: a single `data` field holding JSON.
pub fn encode_body<T: Serialize>(payload: &T) -> Result<String> {
    Ok(format!("data={}", serde_json::to_string(payload)?))
}

/// URL of the grades endpoint for a student.
pub fn grades_url(student_id: &str) -> String {
    format!("{BASE_URL}/eleves/{student_id}/notes.awp?verbe=get")
}

/// Decode a login response body into a session.
pub fn parse_login_response(body: &str) -> Result<Session> {
    let resp: LoginResponse = serde_json::from_str(body)?;
    let token = match resp.token {
        Some(token) if !token.is_empty() => token,
        _ => return Err(Error::Authentication(resp.message.unwrap_or_default())),
    };

    let data = resp
        .data
        .ok_or_else(|| Error::Protocol("login response has no data".into()))?;
    let data: LoginData = serde_json::from_value(data)?;
    let account = data
        .accounts
        .into_iter()
        .next()
        .ok_or_else(|| Error::Protocol("login response lists no account".into()))?;

    let student_id = match account.id {
        serde_json::Value::String(id) => id,
        serde_json::Value::Number(id) => id.to_string(),
        other => {
            return Err(Error::Protocol(format!(
                "account id should be a number, got {other}"
            )))
        }
    };

    Ok(Session {
        token,
        student_id,
        display_name: format!("{} {}", account.nom, account.prenom),
    })
}

/// Decode a grades response body into its records.
pub fn parse_grades_response(body: &str) -> Result<Vec<GradeRecord>> {
    let resp: GradesResponse = serde_json::from_str(body)?;
    if resp.code != SUCCESS_CODE {
        let message = [resp.message, resp.msg]
            .into_iter()
            .flatten()
            .find(|m| !m.is_empty())
            .unwrap_or_default();
        return Err(Error::Fetch {
            code: resp.code,
            message,
        });
    }

    let data = resp
        .data
        .ok_or_else(|| Error::Protocol("grades response has no data".into()))?;
    let data: GradesData = serde_json::from_value(data)?;
    Ok(data.notes)
}
