use crate::console_api::auth_gate::AuthGate;
use crate::console_api::resources::{
    DataAccessPolicy, DataAccessPolicyUpdate, DataAccessQuery, DataAccessesResponse, Tool,
};
use crate::console_api::types::{ConsoleError, HttpFailure};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

const JSON_CONTENT_TYPE: &str = "application/json";

/// One call to the monitored-data API
///
/// Requests are authenticated unless [`without_auth`](Self::without_auth) is
/// used.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: Method,
    /// Path relative to the API base URL, with or without a leading slash
    pub path: String,
    pub body: Option<Value>,
    pub requires_auth: bool,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            requires_auth: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PUT, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Send without a bearer token (public endpoints such as `health`)
    pub fn without_auth(mut self) -> Self {
        self.requires_auth = false;
        self
    }
}

/// Result of a dispatched request that did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// Success with a JSON body
    Json(Value),
    /// Success with no body, or a body that is not JSON
    Empty,
    /// The request needed a session and none could be obtained.
    /// Nothing was sent; callers typically navigate back to the login page.
    Unauthenticated,
}

impl SendOutcome {
    /// The JSON body, if there was one
    pub fn into_json(self) -> Option<Value> {
        match self {
            SendOutcome::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, SendOutcome::Unauthenticated)
    }
}

/// HTTP client for the monitored-data API (Overseer)
///
/// Every call goes through [`send`](Self::send), which either attaches a
/// currently valid bearer token or does not send the request at all.
#[derive(Debug, Clone)]
pub struct RequestClient {
    /// Base URL for the monitored-data API
    base_url: String,
    http: reqwest::Client,
    gate: Arc<AuthGate>,
}

impl RequestClient {
    pub fn new(base_url: impl Into<String>, http: reqwest::Client, gate: Arc<AuthGate>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        tracing::debug!("Creating RequestClient with base URL: {}", base_url);

        Self {
            base_url,
            http,
            gate,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolved URL for a path relative to the base URL
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Dispatch a request
    ///
    /// # Returns
    ///
    /// - `SendOutcome::Unauthenticated` if auth is required and no usable token
    ///   could be obtained; the data service is not contacted
    /// - `SendOutcome::Json` for a success whose content type is JSON
    /// - `SendOutcome::Empty` for any other success
    ///
    /// # Errors
    ///
    /// - `ConsoleError::Request` for a non-success status
    /// - `ConsoleError::Network` / `ConsoleError::Parse` for transport and body failures
    pub async fn send(&self, descriptor: RequestDescriptor) -> Result<SendOutcome, ConsoleError> {
        let RequestDescriptor {
            method,
            path,
            body,
            requires_auth,
        } = descriptor;
        let url = self.url_for(&path);

        let mut request = self.http.request(method.clone(), &url);

        if requires_auth {
            let Some(token) = self.gate.get_usable_token().await else {
                tracing::info!("No usable session, not sending {} {}", method, url);
                return Ok(SendOutcome::Unauthenticated);
            };
            request = request.header(AUTHORIZATION, token.bearer_header());
        }

        if let Some(body) = &body {
            request = request.header(CONTENT_TYPE, JSON_CONTENT_TYPE).json(body);
        }

        tracing::debug!("Sending {} {}", method, url);

        let response = request.send().await.map_err(|e| {
            tracing::error!("Failed to send {} {}: {}", method, url, e);
            ConsoleError::from(e)
        })?;

        let status = response.status();
        tracing::debug!("Received response with status: {}", status);

        if !status.is_success() {
            let failure = HttpFailure::from_response(&response);
            tracing::error!("Request failed: {}", failure);
            return Err(ConsoleError::Request(failure));
        }

        if !has_json_content_type(&response) {
            return Ok(SendOutcome::Empty);
        }

        let bytes = response.bytes().await.map_err(|e| {
            tracing::error!("Failed to read response body: {}", e);
            ConsoleError::Parse(format!("Failed to read response: {}", e))
        })?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(SendOutcome::Empty);
        }

        let value = serde_json::from_slice(&bytes).map_err(|e| {
            tracing::error!("Failed to parse JSON response from {}: {}", url, e);
            ConsoleError::Parse(format!("Failed to parse response: {}", e))
        })?;

        Ok(SendOutcome::Json(value))
    }

    /// GET `path`; `auth` selects whether a bearer token is required
    pub async fn get(&self, path: &str, auth: bool) -> Result<SendOutcome, ConsoleError> {
        self.send(with_auth(RequestDescriptor::get(path), auth)).await
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        auth: bool,
    ) -> Result<SendOutcome, ConsoleError> {
        let descriptor = RequestDescriptor::post(path, to_json_body(body)?);
        self.send(with_auth(descriptor, auth)).await
    }

    pub async fn put<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        auth: bool,
    ) -> Result<SendOutcome, ConsoleError> {
        let descriptor = RequestDescriptor::put(path, to_json_body(body)?);
        self.send(with_auth(descriptor, auth)).await
    }

    pub async fn delete(&self, path: &str, auth: bool) -> Result<SendOutcome, ConsoleError> {
        self.send(with_auth(RequestDescriptor::delete(path), auth)).await
    }

    // Typed monitored-data endpoints. A missing session surfaces as
    // `ConsoleError::Unauthenticated` here.

    /// Check that the monitored-data API and its database are up
    pub async fn health(&self) -> Result<(), ConsoleError> {
        let outcome = self.get("health", false).await?;
        expect_session(outcome).map(|_| ())
    }

    /// Data accesses concerning the logged-in user
    ///
    /// # Example
    ///
    /// ```no_run
    /// use clotilde_sdk::{Console, ConsoleConfig, DataAccessQuery};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let console = Console::new(&ConsoleConfig::from_env()?)?;
    /// console.auth().login("alice@example.com", "secret").await?;
    ///
    /// let query = DataAccessQuery::new().with_limit(50);
    /// let response = console.client().data_accesses(&query).await?;
    /// println!("{} accesses to data of {}", response.accesses.len(), response.owner_rid);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn data_accesses(
        &self,
        query: &DataAccessQuery,
    ) -> Result<DataAccessesResponse, ConsoleError> {
        let path = query.to_path("data-accesses");
        let outcome = self.get(&path, true).await?;
        decode_json(outcome)
    }

    /// All data access policies of the logged-in user
    pub async fn list_policies(&self) -> Result<Vec<DataAccessPolicy>, ConsoleError> {
        let outcome = self.get("data-access-policies", true).await?;
        decode_json(outcome)
    }

    pub async fn get_policy(&self, policy_id: i64) -> Result<DataAccessPolicy, ConsoleError> {
        let outcome = self
            .get(&format!("data-access-policies/{}", policy_id), true)
            .await?;
        decode_json(outcome)
    }

    pub async fn create_policy(
        &self,
        policy: &DataAccessPolicyUpdate,
    ) -> Result<DataAccessPolicy, ConsoleError> {
        tracing::info!("Creating data access policy: {:?}", policy);
        let outcome = self.post("data-access-policies", policy, true).await?;
        decode_json(outcome)
    }

    pub async fn update_policy(
        &self,
        policy_id: i64,
        policy: &DataAccessPolicyUpdate,
    ) -> Result<DataAccessPolicy, ConsoleError> {
        tracing::info!("Updating data access policy {}", policy_id);
        let outcome = self
            .put(&format!("data-access-policies/{}", policy_id), policy, true)
            .await?;
        decode_json(outcome)
    }

    pub async fn delete_policy(&self, policy_id: i64) -> Result<(), ConsoleError> {
        tracing::info!("Deleting data access policy {}", policy_id);
        let outcome = self
            .delete(&format!("data-access-policies/{}", policy_id), true)
            .await?;
        expect_session(outcome).map(|_| ())
    }

    /// Tools known to the monitored-data API
    pub async fn list_tools(&self) -> Result<Vec<Tool>, ConsoleError> {
        let outcome = self.get("tool-types", true).await?;
        decode_json(outcome)
    }

    /// Register a tool (admin only on the server side)
    pub async fn create_tool(&self, tool: &Tool) -> Result<Tool, ConsoleError> {
        tracing::info!("Creating tool type: {}", tool.name);
        let outcome = self.post("tool-types", tool, true).await?;
        decode_json(outcome)
    }

    pub async fn delete_tool(&self, name: &str) -> Result<(), ConsoleError> {
        tracing::info!("Deleting tool type: {}", name);
        let path = format!("tool-types/{}", encode_segment(name));
        let outcome = self.delete(&path, true).await?;
        expect_session(outcome).map(|_| ())
    }
}

fn with_auth(descriptor: RequestDescriptor, auth: bool) -> RequestDescriptor {
    if auth {
        descriptor
    } else {
        descriptor.without_auth()
    }
}

fn to_json_body<B: Serialize + ?Sized>(body: &B) -> Result<Value, ConsoleError> {
    serde_json::to_value(body)
        .map_err(|e| ConsoleError::Parse(format!("Failed to serialize request body: {}", e)))
}

fn has_json_content_type(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains(JSON_CONTENT_TYPE))
}

fn expect_session(outcome: SendOutcome) -> Result<SendOutcome, ConsoleError> {
    match outcome {
        SendOutcome::Unauthenticated => Err(ConsoleError::Unauthenticated),
        other => Ok(other),
    }
}

fn decode_json<T: DeserializeOwned>(outcome: SendOutcome) -> Result<T, ConsoleError> {
    match expect_session(outcome)? {
        SendOutcome::Json(value) => serde_json::from_value(value).map_err(|e| {
            tracing::error!("Failed to parse response: {}", e);
            ConsoleError::Parse(format!("Failed to parse response: {}", e))
        }),
        _ => Err(ConsoleError::Parse(
            "Expected a JSON response body".to_string(),
        )),
    }
}

fn encode_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
