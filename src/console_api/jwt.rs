use crate::console_api::types::ConsoleError;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two claims the console reads from a session credential
///
/// Revolori issues more (`iss`, `iat`, `nbf`, `jti`), they are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject - the user's email address
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// A decoded session token
///
/// Holds the raw bearer credential together with the fields derived from its
/// claims. Tokens are immutable; a refresh replaces the whole value.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    credential: String,
    subject: String,
    expires_at: DateTime<Utc>,
}

impl Token {
    /// Decode a credential string as received from the identity service
    ///
    /// The signature is not checked here; the identity service and the
    /// monitored-data API verify it. Only `sub` and `exp` are extracted.
    ///
    /// # Errors
    ///
    /// Returns `ConsoleError::Decode` if the string is not a JWT, the payload
    /// is not JSON, or `sub`/`exp` are missing or unusable.
    pub fn decode(credential: &str) -> Result<Self, ConsoleError> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(ConsoleError::Decode("Empty credential".to_string()));
        }

        let claims = decode_claims(credential)?;

        if claims.sub.is_empty() {
            return Err(ConsoleError::Decode(
                "Missing or empty subject (sub) claim".to_string(),
            ));
        }

        let expires_at = DateTime::<Utc>::from_timestamp(claims.exp, 0).ok_or_else(|| {
            ConsoleError::Decode(format!("Expiry (exp) claim out of range: {}", claims.exp))
        })?;

        Ok(Self {
            credential: credential.to_string(),
            subject: claims.sub,
            expires_at,
        })
    }

    /// The raw credential, as sent in the `Authorization` header
    pub fn credential(&self) -> &str {
        &self.credential
    }

    /// User identity from the `sub` claim
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// A token is usable only while its expiry is strictly after `now`
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    /// `Authorization` header value for this token
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.credential)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("credential", &credential_preview(&self.credential))
            .field("subject", &self.subject)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// First 8 characters of a credential, for logs and debug output
pub(crate) fn credential_preview(credential: &str) -> String {
    match credential.char_indices().nth(8) {
        Some((idx, _)) if credential.len() > 12 => format!("{}...", &credential[..idx]),
        _ => "***".to_string(),
    }
}

fn decode_claims(credential: &str) -> Result<SessionClaims, ConsoleError> {
    // Signature checking is off, so the algorithm list is never consulted.
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.set_required_spec_claims(&["sub", "exp"]);

    decode::<SessionClaims>(credential, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!("Failed to decode session credential: {}", e);
            ConsoleError::Decode(e.to_string())
        })
}
