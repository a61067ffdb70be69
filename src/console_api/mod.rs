/// Session and API integration for the Clotilde console
///
/// Covers the token lifecycle against the identity service (Revolori) and the
/// authenticated request pipeline towards the monitored-data API (Overseer).
///
/// ## Session Flow
///
/// 1. `AuthGate::login` posts credentials; Revolori returns a short-lived JWT
///    and sets an HTTP-only refresh cookie
/// 2. The JWT is decoded (`sub`, `exp`) and kept in the `TokenStore`
/// 3. `RequestClient::send` asks the gate for a usable token before every
///    authenticated call
/// 4. An expired token is replaced through `GET /refresh`, authenticated only
///    by the cookie
/// 5. If no token can be obtained the request is not sent and the caller gets
///    `SendOutcome::Unauthenticated`
pub mod auth_gate;
pub mod client;
pub mod jwt;
pub mod resources;
pub mod token_store;
pub mod types;

pub use auth_gate::AuthGate;
pub use client::{RequestClient, RequestDescriptor, SendOutcome};
pub use jwt::{SessionClaims, Token};
pub use resources::*;
pub use token_store::{SessionState, TokenStore};
pub use types::{ConsoleError, HttpFailure};
