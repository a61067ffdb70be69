use crate::clock::{Clock, SystemClock};
use crate::console_api::jwt::{credential_preview, Token};
use crate::console_api::token_store::TokenStore;
use crate::console_api::types::{ConsoleError, CredentialResponse, HttpFailure, LoginRequest};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Session gatekeeper in front of the identity service (Revolori)
///
/// Decides whether the cached token is still usable and, when it is not,
/// runs the cookie-authenticated refresh exchange. Also performs login and
/// logout, which are the only other ways the session changes.
///
/// The refresh credential is an HTTP-only cookie set by `POST /login`. It is
/// held by the `reqwest` cookie store of the client passed in, never read by
/// this type.
pub struct AuthGate {
    /// Base URL of the identity service
    identity_url: String,
    http: reqwest::Client,
    store: TokenStore,
    clock: Arc<dyn Clock>,
    /// Held while a refresh exchange is in flight
    refresh_guard: Mutex<()>,
    /// Completed refresh exchanges, bumped while `refresh_guard` is held
    refresh_generation: AtomicU64,
}

impl AuthGate {
    /// Create a gate using the system clock
    ///
    /// `http` must have its cookie store enabled for the refresh flow to work;
    /// [`Console`](crate::Console) takes care of that.
    pub fn new(identity_url: impl Into<String>, http: reqwest::Client, store: TokenStore) -> Self {
        Self::with_clock(identity_url, http, store, Arc::new(SystemClock))
    }

    pub fn with_clock(
        identity_url: impl Into<String>,
        http: reqwest::Client,
        store: TokenStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let identity_url = identity_url.into().trim_end_matches('/').to_string();
        tracing::debug!("Creating AuthGate with identity service: {}", identity_url);

        Self {
            identity_url,
            http,
            store,
            clock,
            refresh_guard: Mutex::new(()),
            refresh_generation: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn identity_url(&self) -> &str {
        &self.identity_url
    }

    /// Return a token that is valid right now, refreshing if needed
    ///
    /// A cached token whose expiry is strictly in the future is returned
    /// without any network traffic. Otherwise one refresh exchange is made.
    /// `None` means there is no session: the refresh cookie is missing or
    /// rejected, the identity service is unreachable, or it answered with
    /// something that is not a credential. This is never an error.
    ///
    /// Overlapping callers share a single refresh. A caller that waited on
    /// an exchange already in flight takes its outcome, successful or not,
    /// instead of starting another one.
    pub async fn get_usable_token(&self) -> Option<Token> {
        if let Some(token) = self.cached_usable_token() {
            return Some(token);
        }

        let seen = self.refresh_generation.load(Ordering::Acquire);
        let _guard = self.refresh_guard.lock().await;

        if let Some(token) = self.cached_usable_token() {
            tracing::debug!("Session refreshed by a concurrent caller");
            return Some(token);
        }
        if self.refresh_generation.load(Ordering::Acquire) != seen {
            tracing::debug!("Concurrent refresh found no session");
            return None;
        }

        match self.exchange().await {
            Ok(Some(token)) => Some(token),
            Ok(None) => {
                self.drop_expired_token();
                None
            }
            Err(e) => {
                tracing::debug!("Token refresh failed, treating as no session: {}", e);
                self.drop_expired_token();
                None
            }
        }
    }

    /// Perform one refresh exchange against `GET /refresh`
    ///
    /// Always contacts the identity service, but waits for any exchange
    /// started by [`get_usable_token`](Self::get_usable_token) to finish
    /// first. Callers waiting in `get_usable_token` meanwhile share this
    /// exchange's outcome.
    ///
    /// # Returns
    ///
    /// `Ok(Some(token))` after storing the new credential, `Ok(None)` when the
    /// identity service reports no session (non-success status, or an empty
    /// or `null` body), or an error for transport and decode failures.
    pub async fn refresh(&self) -> Result<Option<Token>, ConsoleError> {
        let _guard = self.refresh_guard.lock().await;
        self.exchange().await
    }

    /// One refresh exchange; `refresh_guard` must be held
    async fn exchange(&self) -> Result<Option<Token>, ConsoleError> {
        let outcome = self.request_refresh().await;
        self.refresh_generation.fetch_add(1, Ordering::Release);
        outcome
    }

    async fn request_refresh(&self) -> Result<Option<Token>, ConsoleError> {
        let url = format!("{}/refresh", self.identity_url);
        tracing::debug!("Requesting token refresh from: {}", url);

        let response = self.http.get(&url).send().await.map_err(|e| {
            tracing::warn!("Failed to reach identity service for refresh: {}", e);
            ConsoleError::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            // Expected for visitors without a refresh cookie
            tracing::debug!("Refresh rejected: HTTP {}", status.as_u16());
            return Ok(None);
        }

        let body = response.text().await.map_err(|e| {
            tracing::error!("Failed to read refresh response body: {}", e);
            ConsoleError::Parse(format!("Failed to read refresh response: {}", e))
        })?;

        let parsed: Option<CredentialResponse> = if body.trim().is_empty() {
            None
        } else {
            serde_json::from_str(&body).map_err(|e| {
                tracing::error!("Failed to parse refresh response: {}", e);
                ConsoleError::Parse(format!("Failed to parse refresh response: {}", e))
            })?
        };

        let Some(CredentialResponse { token: credential }) = parsed else {
            tracing::debug!("Refresh answered without a credential, no valid session");
            return Ok(None);
        };

        let token = self.store.set(&credential)?;
        tracing::info!(
            "Session refreshed: subject={}, expires_at={}",
            token.subject(),
            token.expires_at()
        );

        Ok(Some(token))
    }

    /// Log in with email and password
    ///
    /// On success the returned credential is stored and the identity service's
    /// `Set-Cookie` refresh cookie lands in the client's cookie store.
    ///
    /// # Errors
    ///
    /// - `ConsoleError::Authentication` for a non-success status
    /// - `ConsoleError::Decode` if the returned credential is malformed
    /// - `ConsoleError::Network` / `ConsoleError::Parse` for transport and body failures
    pub async fn login(&self, email: &str, password: &str) -> Result<Token, ConsoleError> {
        let url = format!("{}/login", self.identity_url);
        tracing::info!("Logging in to identity service as {}", email);

        let response = self
            .http
            .post(&url)
            .json(&LoginRequest { email, password })
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send login request: {}", e);
                ConsoleError::from(e)
            })?;

        if !response.status().is_success() {
            let failure = HttpFailure::from_response(&response);
            tracing::warn!("Login rejected: {}", failure);
            return Err(ConsoleError::Authentication(failure));
        }

        let body: CredentialResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse login response: {}", e);
            ConsoleError::Parse(format!("Failed to parse login response: {}", e))
        })?;

        let token = self.store.set(&body.token)?;
        tracing::info!(
            "Logged in: subject={}, expires_at={}, token={}",
            token.subject(),
            token.expires_at(),
            credential_preview(token.credential())
        );

        Ok(token)
    }

    /// Log out: invalidate the refresh cookie and clear the cached token
    ///
    /// # Errors
    ///
    /// Returns `ConsoleError::Logout` if the identity service cannot be
    /// reached or answers with a non-success status. The cached token is
    /// left in place in that case; the caller may still `clear` the store.
    pub async fn logout(&self) -> Result<(), ConsoleError> {
        let url = format!("{}/login", self.identity_url);
        tracing::info!("Logging out via: {}", url);

        let response = self.http.delete(&url).send().await.map_err(|e| {
            tracing::error!("Failed to send logout request: {}", e);
            ConsoleError::Logout {
                status: None,
                reason: e.to_string(),
            }
        })?;

        if !response.status().is_success() {
            let failure = HttpFailure::from_response(&response);
            tracing::warn!("Logout rejected: {}", failure);
            return Err(ConsoleError::Logout {
                status: Some(failure.status),
                reason: failure.to_string(),
            });
        }

        self.store.clear();
        tracing::info!("Logged out");

        Ok(())
    }

    fn cached_usable_token(&self) -> Option<Token> {
        let now = self.clock.now();
        self.store.read().filter(|token| token.is_usable_at(now))
    }

    /// Expired -> Unauthenticated once recovery has failed
    fn drop_expired_token(&self) {
        let now = self.clock.now();
        if self
            .store
            .read()
            .is_some_and(|token| !token.is_usable_at(now))
        {
            tracing::info!("Session expired and could not be refreshed");
            self.store.clear();
        }
    }
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate")
            .field("identity_url", &self.identity_url)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
