//! Authorization code + PKCE flow manager.
//!
//! `begin` persists a single pending flow in the session store and hands back
//! the authorization URL; `complete` validates the callback against it. The
//! pending flow is consumed by every call to `complete`, whatever the outcome,
//! so a verifier is never used twice.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use log::*;
use subtle::ConstantTimeEq;
use url::Url;

use super::callback::CallbackParams;
use super::pkce::{random_unreserved, PkceVerifier};
use super::provider::Provider;
use super::state::{FlowMode, PendingFlow, SessionStore, FLOW_STATE_KEY};
use crate::error::{oauth_error, Error, ErrorKind, OAuthErrorKind};

/// Length of the generated CSRF `state` value.
pub const STATE_LENGTH: usize = 32;

/// How long a pending flow stays valid.
pub fn flow_ttl() -> Duration {
    Duration::minutes(5)
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A validated callback, ready for token exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedFlow {
    pub code: String,
    pub code_verifier: String,
    pub mode: FlowMode,
}

pub struct FlowManager<P> {
    provider: P,
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
}

impl<P: Provider> FlowManager<P> {
    pub fn new(provider: P, store: Arc<dyn SessionStore>) -> Self {
        Self::with_clock(provider, store, Arc::new(SystemClock))
    }

    pub fn with_clock(provider: P, store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            provider,
            store,
            clock,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Start a flow and return the URL to send the browser to.
    ///
    /// Overwrites any flow that is still pending. Nothing is stored when the
    /// provider cannot build the URL (e.g. no client id configured).
    pub fn begin(&self, mode: FlowMode) -> Result<Url, Error> {
        let verifier = PkceVerifier::generate();
        let challenge = verifier.challenge();
        let request = self
            .provider
            .authorization_url(&random_unreserved(STATE_LENGTH), &challenge)?;

        let pending = PendingFlow {
            code_verifier: verifier.into_string(),
            state: request.state,
            mode,
            created_at: self.clock.now(),
        };
        let serialized = serde_json::to_string(&pending).map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: ErrorKind::OAuth(OAuthErrorKind::StateStorage),
        })?;

        if self.store.get(FLOW_STATE_KEY).is_some() {
            debug!("Replacing an unfinished {} flow", self.provider.provider().as_str());
        }
        self.store.set(FLOW_STATE_KEY, serialized);

        info!(
            "Started {} OAuth flow in {} mode",
            self.provider.provider().as_str(),
            mode
        );
        Ok(request.url)
    }

    /// Validate the callback parameters against the pending flow.
    pub fn complete(&self, callback: &CallbackParams) -> Result<CompletedFlow, Error> {
        let pending = self.take_pending();

        if let Some(code) = callback.error.as_deref() {
            warn!("OAuth provider returned error `{}`", code);
            return Err(oauth_error(
                OAuthErrorKind::AuthorizationDenied(code.to_string()),
                "provider redirected back with an error",
            ));
        }

        let pending = pending.ok_or_else(|| {
            warn!("OAuth callback received without a pending flow");
            oauth_error(OAuthErrorKind::FlowExpired, "no pending OAuth flow")
        })?;

        if pending.is_expired(self.clock.now(), flow_ttl()) {
            warn!(
                "OAuth callback received for a flow started at {}, which has expired",
                pending.created_at
            );
            return Err(oauth_error(
                OAuthErrorKind::FlowExpired,
                "pending OAuth flow has expired",
            ));
        }

        let state_matches = callback
            .state
            .as_deref()
            .map(|received| bool::from(received.as_bytes().ct_eq(pending.state.as_bytes())))
            .unwrap_or(false);
        if !state_matches {
            warn!("OAuth callback state does not match the pending flow");
            return Err(oauth_error(
                OAuthErrorKind::StateMismatch,
                "callback state does not match",
            ));
        }

        let code = callback.code.clone().ok_or_else(|| {
            warn!("OAuth callback is missing the authorization code");
            oauth_error(OAuthErrorKind::MissingCode, "callback has no code")
        })?;

        info!("Completed OAuth callback validation in {} mode", pending.mode);
        Ok(CompletedFlow {
            code,
            code_verifier: pending.code_verifier,
            mode: pending.mode,
        })
    }

    /// True while a flow is stored, expired or not.
    pub fn has_pending(&self) -> bool {
        self.store.get(FLOW_STATE_KEY).is_some()
    }

    fn take_pending(&self) -> Option<PendingFlow> {
        let raw = self.store.take(FLOW_STATE_KEY)?;
        serde_json::from_str(&raw)
            .inspect_err(|e| warn!("Discarding unreadable pending OAuth flow: {}", e))
            .ok()
    }
}
