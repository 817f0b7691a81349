//! Club-side logic sitting between the CLI and the lower crates.
//!
//! `club-auth` and `service` types are wrapped here so the binary only ever
//! handles `domain::error::Error`.

pub mod error;
pub mod location;
pub mod oauth_connection;
pub mod rental_return;

pub use club_auth::oauth::token::Tokens;
pub use club_auth::oauth::{CallbackParams, FlowMode, MemorySessionStore, SessionStore};
