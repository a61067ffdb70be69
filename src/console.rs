//! Composition root wiring the token store, auth gate and request client

use crate::clock::{Clock, SystemClock};
use crate::config::ConsoleConfig;
use crate::console_api::auth_gate::AuthGate;
use crate::console_api::client::RequestClient;
use crate::console_api::jwt::Token;
use crate::console_api::token_store::{SessionState, TokenStore};
use crate::console_api::types::ConsoleError;
use std::sync::Arc;
use tokio::sync::watch;

/// One console session
///
/// Owns the single [`TokenStore`] and hands out the [`AuthGate`] and
/// [`RequestClient`] built on top of it. All three share one `reqwest`
/// client whose cookie store keeps the identity service's refresh cookie,
/// the way a browser would.
#[derive(Clone)]
pub struct Console {
    store: TokenStore,
    gate: Arc<AuthGate>,
    client: RequestClient,
    clock: Arc<dyn Clock>,
}

impl Console {
    pub fn new(config: &ConsoleConfig) -> Result<Self, ConsoleError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Build a console reading time from `clock`
    pub fn with_clock(config: &ConsoleConfig, clock: Arc<dyn Clock>) -> Result<Self, ConsoleError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| ConsoleError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let store = TokenStore::new();
        let gate = Arc::new(AuthGate::with_clock(
            config.identity_url.clone(),
            http.clone(),
            store.clone(),
            clock.clone(),
        ));
        let client = RequestClient::new(config.api_base_url.clone(), http, gate.clone());

        tracing::info!(
            "Console ready: identity_url={}, api_base_url={}",
            config.identity_url,
            config.api_base_url
        );

        Ok(Self {
            store,
            gate,
            client,
            clock,
        })
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn auth(&self) -> &AuthGate {
        &self.gate
    }

    pub fn client(&self) -> &RequestClient {
        &self.client
    }

    /// Observe login, refresh and logout
    pub fn subscribe(&self) -> watch::Receiver<Option<Token>> {
        self.store.subscribe()
    }

    /// Session state right now, without touching the network
    pub fn session_state(&self) -> SessionState {
        self.store.status(self.clock.now())
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console")
            .field("store", &self.store)
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}
