//! Console configuration
//!
//! Two endpoints are needed: the identity service (Revolori) that issues and
//! refreshes session tokens, and the monitored-data API (Overseer). They can be
//! supplied in code, through environment variables, or as TOML.

use crate::console_api::types::ConsoleError;
use serde::Deserialize;

/// Environment variable holding the identity service base URL
pub const IDENTITY_URL_ENV: &str = "REVOLORI_URL";
/// Environment variable holding the monitored-data API base URL
pub const API_BASE_URL_ENV: &str = "OVERSEER_URL";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConsoleConfig {
    /// Base URL of the identity service, e.g. `http://localhost:5429`
    pub identity_url: String,
    /// Base URL of the monitored-data API, e.g. `http://localhost:8000`
    pub api_base_url: String,
}

impl ConsoleConfig {
    /// Build and validate a configuration
    pub fn new(
        identity_url: impl Into<String>,
        api_base_url: impl Into<String>,
    ) -> Result<Self, ConsoleError> {
        Self {
            identity_url: identity_url.into(),
            api_base_url: api_base_url.into(),
        }
        .validated()
    }

    /// Read `REVOLORI_URL` and `OVERSEER_URL`
    pub fn from_env() -> Result<Self, ConsoleError> {
        let identity_url = read_env(IDENTITY_URL_ENV)?;
        let api_base_url = read_env(API_BASE_URL_ENV)?;
        tracing::debug!(
            "Loaded console configuration from environment: identity_url={}, api_base_url={}",
            identity_url,
            api_base_url
        );
        Self::new(identity_url, api_base_url)
    }

    /// Parse a TOML document with `identity_url` and `api_base_url` keys
    pub fn from_toml_str(source: &str) -> Result<Self, ConsoleError> {
        let config: Self = toml::from_str(source)
            .map_err(|e| ConsoleError::Config(format!("Invalid TOML configuration: {}", e)))?;
        config.validated()
    }

    fn validated(mut self) -> Result<Self, ConsoleError> {
        self.identity_url = normalize_base_url("identity_url", &self.identity_url)?;
        self.api_base_url = normalize_base_url("api_base_url", &self.api_base_url)?;
        Ok(self)
    }
}

fn read_env(name: &str) -> Result<String, ConsoleError> {
    std::env::var(name)
        .map_err(|_| ConsoleError::Config(format!("Environment variable {} is not set", name)))
}

/// Absolute http(s) URL without trailing slash
fn normalize_base_url(field: &str, value: &str) -> Result<String, ConsoleError> {
    let trimmed = value.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ConsoleError::Config(format!("{} must not be empty", field)));
    }

    let parsed = url::Url::parse(trimmed)
        .map_err(|e| ConsoleError::Config(format!("{} is not a valid URL: {}", field, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConsoleError::Config(format!(
            "{} must use http or https, got '{}'",
            field,
            parsed.scheme()
        )));
    }

    Ok(trimmed.to_string())
}
