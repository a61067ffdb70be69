//! Shared helpers for the mock-server tests

#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use clotilde_sdk::{Clock, Console, ConsoleConfig};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;
use std::sync::{Arc, Mutex};
use wiremock::MockServer;

/// Sign a session credential the way Revolori does (claims only matter here)
pub fn mint(sub: &str, exp: DateTime<Utc>) -> String {
    let claims = json!({
        "sub": sub,
        "exp": exp.timestamp(),
        "iat": Utc::now().timestamp(),
        "iss": "http://localhost:5429",
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"revolori-test-secret"),
    )
    .unwrap()
}

/// Credential valid for another hour
pub fn fresh(sub: &str) -> String {
    mint(sub, Utc::now() + Duration::hours(1))
}

/// Credential that expired an hour ago
pub fn expired(sub: &str) -> String {
    mint(sub, Utc::now() - Duration::hours(1))
}

/// Clock that only moves when told to
pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self(Mutex::new(start)))
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.0.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

/// Identity service and monitored-data API mocks plus a console wired to them
pub struct Harness {
    pub identity: MockServer,
    pub api: MockServer,
    pub console: Console,
}

impl Harness {
    pub async fn start() -> Self {
        init_tracing();
        let identity = MockServer::start().await;
        let api = MockServer::start().await;
        let config = ConsoleConfig::new(identity.uri(), api.uri()).unwrap();
        let console = Console::new(&config).unwrap();
        Self {
            identity,
            api,
            console,
        }
    }

    pub async fn start_with_clock(clock: Arc<dyn Clock>) -> Self {
        init_tracing();
        let identity = MockServer::start().await;
        let api = MockServer::start().await;
        let config = ConsoleConfig::new(identity.uri(), api.uri()).unwrap();
        let console = Console::with_clock(&config, clock).unwrap();
        Self {
            identity,
            api,
            console,
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
