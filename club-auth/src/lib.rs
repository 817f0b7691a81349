//! # club-auth
//!
//! Sign-in plumbing for the club application:
//! - PKCE verifier/challenge generation (RFC 7636, S256)
//! - The pending-flow store and the flow manager that begins and completes
//!   an authorization code flow
//! - OAuth provider implementations (Google)
//! - HTTP client building for provider endpoints
//!
//! ## Usage
//!
//! ```rust,ignore
//! use club_auth::oauth::{providers::google, FlowManager, FlowMode, MemorySessionStore};
//!
//! let provider = google::Provider::new(google::Settings::new(client_id, None, origin))?;
//! let manager = FlowManager::new(provider, Arc::new(MemorySessionStore::new()));
//! let url = manager.begin(FlowMode::Login)?;
//! ```

pub mod error;
pub mod http;
pub mod oauth;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
