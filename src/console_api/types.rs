use hyper::ext::ReasonPhrase;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reason text for a status with neither a server phrase nor a standard one
const UNKNOWN_STATUS_TEXT: &str = "Unknown Status";

/// Clotilde console error type
///
/// Represents all possible errors that can occur while managing the session
/// token or talking to the identity service and the monitored-data API.
///
/// A failed token refresh is deliberately absent from this list: it is the
/// normal state of a visitor without a session and is reported as `None`.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    /// The credential could not be decoded into subject and expiry
    #[error("Token decode failed: {0}")]
    Decode(String),
    /// Login was rejected by the identity service
    #[error("Authentication failed: {0}")]
    Authentication(HttpFailure),
    /// Logout could not be completed
    #[error("Logout failed: {reason}")]
    Logout {
        /// HTTP status, when the identity service answered at all
        status: Option<u16>,
        reason: String,
    },
    /// The monitored-data API answered with a non-success status
    #[error("Request failed: {0}")]
    Request(HttpFailure),
    /// An authenticated typed call found no usable session
    #[error("No usable session, authentication required")]
    Unauthenticated,
    /// Transport failure (connection refused, DNS, TLS, ...)
    #[error("Network error: {0}")]
    Network(String),
    /// Response body could not be read or deserialized
    #[error("Parse error: {0}")]
    Parse(String),
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ConsoleError {
    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ConsoleError::Authentication(failure) | ConsoleError::Request(failure) => {
                Some(failure.status)
            }
            ConsoleError::Logout { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ConsoleError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            ConsoleError::Network(format!("Connection failed: {}", err))
        } else if err.is_decode() {
            ConsoleError::Parse(err.to_string())
        } else {
            ConsoleError::Network(err.to_string())
        }
    }
}

/// Non-success HTTP answer: status, reason phrase and the URL that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpFailure {
    pub status: u16,
    pub status_text: String,
    pub url: String,
}

impl HttpFailure {
    pub(crate) fn from_response(response: &reqwest::Response) -> Self {
        let status = response.status();
        Self {
            status: status.as_u16(),
            status_text: status_text(status, response.extensions().get::<ReasonPhrase>()),
            url: response.url().to_string(),
        }
    }
}

/// The server's reason phrase, else the standard one for `status`
fn status_text(status: StatusCode, reason: Option<&ReasonPhrase>) -> String {
    reason
        .and_then(|phrase| std::str::from_utf8(phrase.as_bytes()).ok())
        .filter(|phrase| !phrase.trim().is_empty())
        .or_else(|| status.canonical_reason())
        .unwrap_or(UNKNOWN_STATUS_TEXT)
        .to_string()
}

impl fmt::Display for HttpFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}. Caused by a request to {}.",
            self.status, self.status_text, self.url
        )
    }
}

/// Body of `POST /login`
#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Body returned by `POST /login` and `GET /refresh`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CredentialResponse {
    pub token: String,
}
