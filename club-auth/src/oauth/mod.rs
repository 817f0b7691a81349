//! OAuth 2.0 authentication infrastructure.
//!
//! Provides the authorization code flow with PKCE security for member sign-in and account linking.

mod callback;
mod flow;
mod pkce;
mod provider;
mod state;

pub mod providers;
pub mod token;

pub use callback::CallbackParams;
pub use flow::{flow_ttl, Clock, CompletedFlow, FlowManager, SystemClock, STATE_LENGTH};
pub use pkce::{PkceChallenge, PkceVerifier, CHALLENGE_METHOD, VERIFIER_LENGTH};
pub use provider::{AuthorizationRequest, Provider, ProviderKind};
pub use state::{FlowMode, MemorySessionStore, PendingFlow, SessionStore, FLOW_STATE_KEY};
