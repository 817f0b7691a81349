//! Pending flow state and the session-scoped store it lives in.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Fixed key under which the single pending flow is stored.
pub const FLOW_STATE_KEY: &str = "pkce_flow";

/// What the application does with the account once the callback succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowMode {
    /// Attach the Google account to the member who is already signed in.
    Link,
    /// Sign in (or sign up) with the Google account.
    Login,
}

impl FlowMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowMode::Link => "link",
            FlowMode::Login => "login",
        }
    }
}

impl fmt::Display for FlowMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct FlowModeParseError(String);

impl fmt::Display for FlowModeParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unknown flow mode `{}` (expected `link` or `login`)", self.0)
    }
}

impl std::error::Error for FlowModeParseError {}

impl FromStr for FlowMode {
    type Err = FlowModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "link" => Ok(FlowMode::Link),
            "login" => Ok(FlowMode::Login),
            other => Err(FlowModeParseError(other.to_string())),
        }
    }
}

/// State persisted between `begin` and `complete`.
///
/// The code challenge is derived from `code_verifier` and never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingFlow {
    pub code_verifier: String,
    pub state: String,
    pub mode: FlowMode,
    pub created_at: DateTime<Utc>,
}

impl PendingFlow {
    /// True once more than `ttl` has elapsed since the flow was created.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.created_at > ttl
    }
}

/// Scoped key-value store holding transient per-session values.
///
/// Mirrors a browser tab's session storage: values are strings, not shared
/// across sessions and not durable. Expiry policy belongs to the caller.
pub trait SessionStore: Send + Sync {
    fn set(&self, key: &str, value: String);

    fn get(&self, key: &str) -> Option<String>;

    /// Remove the value under `key`, returning it if it was present.
    fn take(&self, key: &str) -> Option<String>;
}

/// In-memory [`SessionStore`] for non-browser targets and tests.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn set(&self, key: &str, value: String) {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value);
    }

    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.get(key).cloned()
    }

    fn take(&self, key: &str) -> Option<String> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.remove(key)
    }
}
