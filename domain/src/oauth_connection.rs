use crate::error::Error;
use club_auth::oauth::providers::google::{self, Settings};
use club_auth::oauth::token::Tokens;
use club_auth::oauth::{CallbackParams, FlowManager, FlowMode, Provider, SessionStore};
use log::*;
use service::config::Config;
use std::sync::Arc;
use url::Url;

/// Result of a successful sign-in or account link.
#[derive(Debug, Clone)]
pub struct LinkedAccount {
    pub mode: FlowMode,
    pub tokens: Tokens,
}

/// Build the Google provider from the application configuration.
pub fn google_provider(config: &Config) -> Result<google::Provider, Error> {
    let settings = Settings {
        client_id: config.google_client_id(),
        client_secret: config.google_client_secret(),
        origin: config.app_origin().to_string(),
        auth_url: config.google_auth_url().to_string(),
        token_url: config.google_token_url().to_string(),
    };
    Ok(google::Provider::new(settings)?)
}

/// Flow manager backed by the given session store.
pub fn flow_manager(
    config: &Config,
    store: Arc<dyn SessionStore>,
) -> Result<FlowManager<google::Provider>, Error> {
    let provider = google_provider(config)?;
    debug!(
        "Google OAuth redirect URI is {}",
        provider.redirect_uri().as_str()
    );
    Ok(FlowManager::new(provider, store))
}

/// Start a Google sign-in (or account link) and return the URL to open.
pub fn begin<P: Provider>(manager: &FlowManager<P>, mode: FlowMode) -> Result<Url, Error> {
    let url = manager
        .begin(mode)
        .inspect_err(|e| warn!("Failed to start Google OAuth flow: {}", e))?;
    Ok(url)
}

/// Validate the callback and exchange the code for tokens.
pub async fn complete_and_exchange<P: Provider>(
    manager: &FlowManager<P>,
    callback: &CallbackParams,
) -> Result<LinkedAccount, Error> {
    let completed = manager.complete(callback).inspect_err(|e| {
        if e.is_flow_terminal() {
            info!("Google OAuth callback ended the flow, member has to start again: {}", e)
        } else {
            warn!("Rejected Google OAuth callback: {:?}", e)
        }
    })?;

    let tokens = manager
        .provider()
        .exchange_code(&completed.code, &completed.code_verifier)
        .await
        .inspect_err(|e| warn!("Failed to exchange Google OAuth code: {:?}", e))?;

    info!(
        "Google account {} completed, access token expires at {:?}",
        completed.mode, tokens.expires_at
    );
    Ok(LinkedAccount {
        mode: completed.mode,
        tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AuthErrorKind, DomainErrorKind, ExternalErrorKind, InternalErrorKind};
    use clap::Parser;
    use club_auth::oauth::MemorySessionStore;
    use mockito::{Matcher, Server};
    use secrecy::ExposeSecret;

    fn config(token_url: &str) -> Config {
        Config::try_parse_from([
            "clubgear",
            "--google-client-id",
            "club.apps.googleusercontent.com",
            "--app-origin",
            "https://club.example.com",
        ])
        .unwrap()
        .set_google_token_url(token_url.to_string())
    }

    fn callback_for(url: &Url, code: &str) -> CallbackParams {
        let state = url
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned());
        CallbackParams {
            code: Some(code.to_string()),
            state,
            error: None,
        }
    }

    #[test]
    fn test_begin_uses_configured_origin() {
        let manager = flow_manager(
            &config("http://127.0.0.1:9/token"),
            Arc::new(MemorySessionStore::new()),
        )
        .unwrap();
        let url = begin(&manager, FlowMode::Link).unwrap();

        let redirect = url
            .query_pairs()
            .find(|(k, _)| k == "redirect_uri")
            .map(|(_, v)| v.into_owned());
        assert_eq!(
            redirect.as_deref(),
            Some("https://club.example.com/auth/google/callback")
        );
        assert!(manager.has_pending());
    }

    #[test]
    fn test_begin_without_client_id_is_a_config_error() {
        let config = config("http://127.0.0.1:9/token").set_google_client_id(None);
        let manager = flow_manager(&config, Arc::new(MemorySessionStore::new())).unwrap();

        let err = begin(&manager, FlowMode::Login).unwrap_err();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Config)
        );
        assert!(!manager.has_pending());
    }

    #[tokio::test]
    async fn test_complete_and_exchange_returns_tokens() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("code".into(), "auth-code".into()),
                Matcher::UrlEncoded("client_id".into(), "club.apps.googleusercontent.com".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"ya29.token","expires_in":3600,"token_type":"Bearer"}"#)
            .create_async()
            .await;

        let manager = flow_manager(
            &config(&format!("{}/token", server.url())),
            Arc::new(MemorySessionStore::new()),
        )
        .unwrap();
        let url = begin(&manager, FlowMode::Login).unwrap();

        let account = complete_and_exchange(&manager, &callback_for(&url, "auth-code"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(account.mode, FlowMode::Login);
        assert_eq!(account.tokens.access_token.expose_secret(), "ya29.token");
        assert!(!manager.has_pending());
    }

    #[tokio::test]
    async fn test_rejected_callback_never_reaches_token_endpoint() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .expect(0)
            .create_async()
            .await;

        let manager = flow_manager(
            &config(&format!("{}/token", server.url())),
            Arc::new(MemorySessionStore::new()),
        )
        .unwrap();
        begin(&manager, FlowMode::Link).unwrap();

        let forged = CallbackParams {
            code: Some("auth-code".to_string()),
            state: Some("not-the-state".to_string()),
            error: None,
        };
        let err = complete_and_exchange(&manager, &forged).await.unwrap_err();

        mock.assert_async().await;
        assert_eq!(
            err.error_kind,
            DomainErrorKind::External(ExternalErrorKind::Auth(AuthErrorKind::StateMismatch))
        );
    }

    #[tokio::test]
    async fn test_token_endpoint_rejection_maps_to_token_exchange() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":"invalid_grant","error_description":"Bad Request"}"#)
            .create_async()
            .await;

        let manager = flow_manager(
            &config(&format!("{}/token", server.url())),
            Arc::new(MemorySessionStore::new()),
        )
        .unwrap();
        let url = begin(&manager, FlowMode::Login).unwrap();

        let err = complete_and_exchange(&manager, &callback_for(&url, "stale-code"))
            .await
            .unwrap_err();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::External(ExternalErrorKind::Auth(AuthErrorKind::TokenExchange))
        );
    }
}
