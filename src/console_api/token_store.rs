use crate::console_api::jwt::Token;
use crate::console_api::types::ConsoleError;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;

/// Session state derived from the store contents and the current time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No token is cached
    Unauthenticated,
    /// A token is cached and its expiry is in the future
    Valid,
    /// A token is cached but has expired; a refresh may recover it
    Expired,
}

/// Holder of the current session token
///
/// One instance exists per [`Console`](crate::Console); clones share the same
/// cell. Every mutation is published to subscribers before the mutating call
/// returns, so views can re-render on login and logout without polling.
///
/// The token lives only in memory. The long-lived refresh credential is an
/// HTTP-only cookie kept by the HTTP client and never passes through here.
#[derive(Debug, Clone)]
pub struct TokenStore {
    state: Arc<watch::Sender<Option<Token>>>,
}

impl TokenStore {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            state: Arc::new(sender),
        }
    }

    /// Current token, if any
    pub fn read(&self) -> Option<Token> {
        self.state.borrow().clone()
    }

    /// Decode `credential` and store it, replacing any previous token
    ///
    /// # Errors
    ///
    /// Returns `ConsoleError::Decode` if the credential is malformed. The store
    /// is left unchanged and subscribers are not notified in that case.
    pub fn set(&self, credential: &str) -> Result<Token, ConsoleError> {
        let token = Token::decode(credential)?;

        tracing::debug!(
            "Storing session token: subject={}, expires_at={}",
            token.subject(),
            token.expires_at()
        );
        self.state.send_replace(Some(token.clone()));

        Ok(token)
    }

    /// Remove the stored token, returning the one that was held
    pub fn clear(&self) -> Option<Token> {
        let previous = self.state.send_replace(None);
        if let Some(token) = &previous {
            tracing::debug!("Cleared session token for subject={}", token.subject());
        }
        previous
    }

    /// Observe every change to the stored token
    ///
    /// The receiver starts out with the current value marked as seen; await
    /// `changed()` to be woken by the next `set` or `clear`.
    pub fn subscribe(&self) -> watch::Receiver<Option<Token>> {
        self.state.subscribe()
    }

    /// Classify the session at instant `now`
    pub fn status(&self, now: DateTime<Utc>) -> SessionState {
        match self.state.borrow().as_ref() {
            None => SessionState::Unauthenticated,
            Some(token) if token.is_usable_at(now) => SessionState::Valid,
            Some(_) => SessionState::Expired,
        }
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}
