//! Google OAuth provider implementation.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::*;
use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

use crate::error::{config_error, oauth_error, ConfigErrorKind, Error, ErrorKind, OAuthErrorKind};
use crate::http::HttpClientBuilder;
use crate::oauth::token::Tokens;
use crate::oauth::{AuthorizationRequest, PkceChallenge, ProviderKind, CHALLENGE_METHOD};

/// Google's authorization endpoint.
pub const DEFAULT_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google's token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Path on the application origin that receives the redirect.
pub const CALLBACK_PATH: &str = "/auth/google/callback";

/// Scopes requested for both linking and login.
pub const SCOPES: &str = "openid email profile";

/// Inputs needed to build a [`Provider`].
#[derive(Debug, Clone)]
pub struct Settings {
    /// OAuth client id; `None` or empty makes every flow fail with a configuration error.
    pub client_id: Option<String>,
    /// Only sent to the token endpoint when present.
    pub client_secret: Option<String>,
    /// Origin the browser runs on, e.g. `https://club.example.com`.
    pub origin: String,
    pub auth_url: String,
    pub token_url: String,
}

impl Settings {
    /// Settings pointing at Google's production endpoints.
    pub fn new(client_id: Option<String>, client_secret: Option<String>, origin: String) -> Self {
        Self {
            client_id,
            client_secret,
            origin,
            auth_url: DEFAULT_AUTH_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
        }
    }
}

/// Google OAuth provider.
///
/// Handles the two provider-facing steps of the authorization code flow:
/// - Authorization URL generation with PKCE (S256)
/// - Authorization code exchange with the stored verifier
pub struct Provider {
    client_id: Option<String>,
    client_secret: Option<String>,
    redirect_uri: Url,
    auth_url: Url,
    token_url: Url,
    http_client: reqwest::Client,
}

impl Provider {
    /// Create a new Google OAuth provider.
    ///
    /// Fails only when one of the configured URLs cannot be parsed. A missing
    /// client id is reported later, when a flow is started.
    pub fn new(settings: Settings) -> Result<Self, Error> {
        let redirect_uri = redirect_uri_for(&settings.origin)?;
        let auth_url = Url::parse(&settings.auth_url)?;
        let token_url = Url::parse(&settings.token_url)?;
        let http_client = HttpClientBuilder::new().build()?;

        Ok(Self {
            client_id: settings.client_id.filter(|id| !id.trim().is_empty()),
            client_secret: settings.client_secret.filter(|s| !s.is_empty()),
            redirect_uri,
            auth_url,
            token_url,
            http_client,
        })
    }

    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    fn client_id(&self) -> Result<&str, Error> {
        self.client_id.as_deref().ok_or_else(|| {
            config_error(
                ConfigErrorKind::MissingClientId,
                "Google OAuth client id is not configured",
            )
        })
    }
}

/// Redirect URI derived from the application origin and [`CALLBACK_PATH`].
pub fn redirect_uri_for(origin: &str) -> Result<Url, Error> {
    let origin = Url::parse(origin)?;
    Ok(origin.join(CALLBACK_PATH)?)
}

#[async_trait]
impl crate::oauth::Provider for Provider {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Google
    }

    fn authorization_url(
        &self,
        state: &str,
        pkce_challenge: &PkceChallenge,
    ) -> Result<AuthorizationRequest, Error> {
        let client_id = self.client_id()?;

        let mut url = self.auth_url.clone();
        url.query_pairs_mut()
            .clear()
            .append_pair("client_id", client_id)
            .append_pair("redirect_uri", self.redirect_uri.as_str())
            .append_pair("response_type", "code")
            .append_pair("scope", SCOPES)
            .append_pair("code_challenge", pkce_challenge.as_str())
            .append_pair("code_challenge_method", CHALLENGE_METHOD)
            .append_pair("state", state)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");

        Ok(AuthorizationRequest {
            url,
            state: state.to_string(),
        })
    }

    async fn exchange_code(&self, code: &str, pkce_verifier: &str) -> Result<Tokens, Error> {
        let client_id = self.client_id()?;

        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("client_id", client_id),
            ("code_verifier", pkce_verifier),
        ];
        if let Some(secret) = self.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }

        debug!("Exchanging Google OAuth code for tokens");

        let response = self
            .http_client
            .post(self.token_url.clone())
            .form(&form)
            .send()
            .await
            .inspect_err(|e| warn!("Failed to reach Google token endpoint: {:?}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<TokenErrorResponse>(&body)
                .map(|e| e.to_string())
                .unwrap_or(body);
            warn!("Google OAuth code exchange failed ({}): {}", status, reason);
            return Err(oauth_error(
                OAuthErrorKind::TokenExchangeFailed,
                &format!("token endpoint returned {}: {}", status, reason),
            ));
        }

        let token_response: TokenResponse = response.json().await.map_err(|e| {
            warn!("Failed to parse Google token response: {:?}", e);
            Error {
                source: Some(Box::new(e)),
                error_kind: ErrorKind::OAuth(OAuthErrorKind::InvalidResponse),
            }
        })?;

        info!("Successfully exchanged Google OAuth code for tokens");
        Ok(token_response.into_tokens(Utc::now()))
    }
}

/// Successful token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    scope: String,
    token_type: String,
}

impl TokenResponse {
    fn into_tokens(self, received_at: DateTime<Utc>) -> Tokens {
        Tokens {
            access_token: SecretString::new(self.access_token),
            refresh_token: self.refresh_token.map(SecretString::new),
            id_token: self.id_token.map(SecretString::new),
            expires_at: self
                .expires_in
                .map(|secs| received_at + Duration::seconds(secs)),
            token_type: self.token_type,
            scopes: self.scope.split_whitespace().map(str::to_string).collect(),
        }
    }
}

/// Error body returned by the token endpoint (RFC 6749 section 5.2).
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl std::fmt::Display for TokenErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self.error_description {
            Some(description) => write!(f, "{} ({})", self.error, description),
            None => f.write_str(&self.error),
        }
    }
}
