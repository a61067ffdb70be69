//! Clotilde SDK
//!
//! Client-side session handling for the Clotilde inverse transparency console.
//!
//! This SDK provides:
//! - A session token store with change notifications
//! - Lazy token refresh through the identity service's cookie-based refresh flow
//! - An authenticated client for the monitored-data API that never sends a
//!   request with a stale or missing token
//! - Typed models for data accesses, data access policies and tools
//!
//! # Example
//!
//! ```no_run
//! use clotilde_sdk::{Console, ConsoleConfig, SendOutcome};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConsoleConfig::new("http://localhost:5429", "http://localhost:8000")?;
//! let console = Console::new(&config)?;
//!
//! // Log in; the refresh cookie stays in the console's cookie store
//! let token = console.auth().login("alice@example.com", "secret").await?;
//! println!("Logged in as {}", token.subject());
//!
//! // Authenticated request, refreshed transparently when the token expires
//! match console.client().get("data-accesses", true).await? {
//!     SendOutcome::Json(body) => println!("{}", body),
//!     SendOutcome::Empty => println!("no content"),
//!     SendOutcome::Unauthenticated => println!("session lost, back to login"),
//! }
//!
//! console.auth().logout().await?;
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod console;
pub mod console_api;

// Re-export commonly used types
pub use clock::{Clock, SystemClock};
pub use config::ConsoleConfig;
pub use console::Console;
pub use console_api::{
    auth_gate::AuthGate,
    client::{RequestClient, RequestDescriptor, SendOutcome},
    jwt::{SessionClaims, Token},
    resources::{
        DataAccess, DataAccessKind, DataAccessPolicy, DataAccessPolicyUpdate, DataAccessQuery,
        DataAccessesResponse, Tool,
    },
    token_store::{SessionState, TokenStore},
    types::{ConsoleError, HttpFailure},
};
