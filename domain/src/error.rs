//! Error types for the `domain` layer.
use club_auth::error::{
    ConfigErrorKind as AuthConfigErrorKind, Error as ClubAuthError,
    ErrorKind as ClubAuthErrorKind, OAuthErrorKind,
};
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the Domain layer are modeled as a tree structure
/// with `domain::error::Error` as the root type holding a tree of `error_kind`
/// enums that represent the kinds of errors that can occur in the domain layer or
/// in lower layers. The `source` field is used to hold the original error that caused
/// the domain error. `domain` depends on `club-auth`, and the binary depends on `domain`,
/// so the binary only ever matches on domain error kinds.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
}

#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Config,
    InvalidInput(String),
    Other(String),
}

/// Enum representing the various kinds of external errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    Auth(AuthErrorKind),
    Network,
    Other(String),
}

/// Sign-in failures the user can act on by restarting the flow.
#[derive(Debug, PartialEq)]
pub enum AuthErrorKind {
    AuthorizationDenied(String),
    FlowExpired,
    StateMismatch,
    MissingCode,
    TokenExchange,
}

impl Error {
    pub fn invalid_input(message: &str) -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::InvalidInput(
                message.to_string(),
            )),
        }
    }

    /// The message shown to a member when a sign-in attempt fails.
    pub fn user_message(&self) -> String {
        match &self.error_kind {
            DomainErrorKind::Internal(InternalErrorKind::Config) => {
                "Google sign-in is not configured. Ask a club administrator to set the client id."
                    .to_string()
            }
            DomainErrorKind::External(ExternalErrorKind::Auth(kind)) => match kind {
                AuthErrorKind::AuthorizationDenied(code) => {
                    format!("Google sign-in was not completed ({}). Please try again.", code)
                }
                AuthErrorKind::FlowExpired => {
                    "Your sign-in session expired. Please start again.".to_string()
                }
                AuthErrorKind::StateMismatch | AuthErrorKind::MissingCode => {
                    "The sign-in response could not be verified. Please start again.".to_string()
                }
                AuthErrorKind::TokenExchange => {
                    "Google rejected the sign-in. Please start again.".to_string()
                }
            },
            DomainErrorKind::External(ExternalErrorKind::Network) => {
                "Could not reach Google. Check your connection and try again.".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Domain Error: {self:?}")
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

// This is where we translate errors from the `club-auth` layer to the `domain` layer.
impl From<ClubAuthError> for Error {
    fn from(err: ClubAuthError) -> Self {
        let error_kind = match &err.error_kind {
            ClubAuthErrorKind::Config(AuthConfigErrorKind::MissingClientId) => {
                DomainErrorKind::Internal(InternalErrorKind::Config)
            }
            ClubAuthErrorKind::Config(AuthConfigErrorKind::InvalidUrl) => DomainErrorKind::Internal(
                InternalErrorKind::Other("Invalid OAuth endpoint or origin URL".to_string()),
            ),
            ClubAuthErrorKind::OAuth(kind) => oauth_error_kind(kind),
            ClubAuthErrorKind::Http(_) => DomainErrorKind::External(ExternalErrorKind::Network),
        };
        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

fn oauth_error_kind(kind: &OAuthErrorKind) -> DomainErrorKind {
    let auth_kind = match kind {
        OAuthErrorKind::AuthorizationDenied(code) => AuthErrorKind::AuthorizationDenied(code.clone()),
        OAuthErrorKind::FlowExpired => AuthErrorKind::FlowExpired,
        OAuthErrorKind::StateMismatch => AuthErrorKind::StateMismatch,
        OAuthErrorKind::MissingCode => AuthErrorKind::MissingCode,
        OAuthErrorKind::TokenExchangeFailed | OAuthErrorKind::InvalidResponse => {
            AuthErrorKind::TokenExchange
        }
        OAuthErrorKind::StateStorage => {
            return DomainErrorKind::Internal(InternalErrorKind::Other(
                "Failed to persist OAuth flow state".to_string(),
            ))
        }
    };
    DomainErrorKind::External(ExternalErrorKind::Auth(auth_kind))
}
