//! OAuth provider trait and types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use super::pkce::PkceChallenge;
use super::token::Tokens;
use crate::error::Error;

/// Known OAuth providers for member sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Google,
}

impl ProviderKind {
    /// Get the provider identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Google => "google",
        }
    }
}

/// Authorization request with URL and state management data.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Authorization URL to redirect the user to.
    pub url: Url,
    /// CSRF state parameter embedded in `url`.
    pub state: String,
}

/// Trait for OAuth 2.0 providers.
///
/// Implementations handle platform-specific pieces of the authorization code flow:
/// - Authorization URL generation with a PKCE challenge
/// - Authorization code exchange using the matching verifier
#[async_trait]
pub trait Provider: Send + Sync {
    /// Get the provider kind.
    fn provider(&self) -> ProviderKind;

    /// Generate the authorization URL for `state` and `pkce_challenge`.
    ///
    /// Fails with a configuration error when the client id is missing.
    fn authorization_url(
        &self,
        state: &str,
        pkce_challenge: &PkceChallenge,
    ) -> Result<AuthorizationRequest, Error>;

    /// Exchange authorization code for access and refresh tokens.
    ///
    /// # Arguments
    ///
    /// * `code` - Authorization code from OAuth callback
    /// * `pkce_verifier` - PKCE code verifier stored when the flow began
    async fn exchange_code(&self, code: &str, pkce_verifier: &str) -> Result<Tokens, Error>;
}
