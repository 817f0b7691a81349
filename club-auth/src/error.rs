//! Error types for the `club-auth` crate.
//!
//! Follows the same pattern as domain::error with a root Error struct and error kind enums.

use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for club-auth crate.
/// Holds error kind and optional source for error chaining.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors in club-auth.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    Config(ConfigErrorKind),
    OAuth(OAuthErrorKind),
    Http(HttpErrorKind),
}

/// Errors from missing or malformed client configuration.
#[derive(Debug, PartialEq)]
pub enum ConfigErrorKind {
    MissingClientId,
    InvalidUrl,
}

/// Errors from the authorization code flow.
///
/// Every variant is terminal for the flow it occurred in: the user has to
/// start over from the authorization URL.
#[derive(Debug, PartialEq)]
pub enum OAuthErrorKind {
    /// The provider redirected back with an `error` parameter (value kept verbatim).
    AuthorizationDenied(String),
    /// No pending flow, or the pending flow is older than its time to live.
    FlowExpired,
    /// The callback `state` does not match the pending flow.
    StateMismatch,
    /// The callback carried a matching `state` but no `code`.
    MissingCode,
    /// The pending flow could not be written to the session store.
    StateStorage,
    TokenExchangeFailed,
    InvalidResponse,
}

/// Errors from HTTP client operations.
#[derive(Debug, PartialEq)]
pub enum HttpErrorKind {
    BuilderFailed,
    RequestFailed,
    Network,
}

impl Error {
    /// Returns true when the user should be offered to restart the flow.
    pub fn is_flow_terminal(&self) -> bool {
        matches!(
            self.error_kind,
            ErrorKind::Config(ConfigErrorKind::MissingClientId)
                | ErrorKind::OAuth(
                    OAuthErrorKind::AuthorizationDenied(_)
                        | OAuthErrorKind::FlowExpired
                        | OAuthErrorKind::StateMismatch
                        | OAuthErrorKind::MissingCode
                )
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::Config(ConfigErrorKind::MissingClientId) => write!(
                f,
                "Configuration error: no OAuth client id is configured (set GOOGLE_CLIENT_ID)"
            ),
            ErrorKind::Config(kind) => write!(f, "Configuration error: {:?}", kind),
            ErrorKind::OAuth(OAuthErrorKind::AuthorizationDenied(code)) => {
                write!(f, "Authorization denied by provider: {}", code)
            }
            ErrorKind::OAuth(OAuthErrorKind::FlowExpired) => write!(
                f,
                "OAuth error: no pending sign-in or it has expired, please start again"
            ),
            ErrorKind::OAuth(OAuthErrorKind::StateMismatch) => write!(
                f,
                "OAuth error: state parameter does not match the pending sign-in"
            ),
            ErrorKind::OAuth(kind) => write!(f, "OAuth error: {:?}", kind),
            ErrorKind::Http(kind) => write!(f, "HTTP error: {:?}", kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let error_kind = if err.is_builder() {
            ErrorKind::Http(HttpErrorKind::BuilderFailed)
        } else if err.is_request() {
            ErrorKind::Http(HttpErrorKind::RequestFailed)
        } else {
            ErrorKind::Http(HttpErrorKind::Network)
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: ErrorKind::Config(ConfigErrorKind::InvalidUrl),
        }
    }
}

/// Helper function to create OAuth errors.
pub fn oauth_error(kind: OAuthErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::OAuth(kind),
    }
}

/// Helper function to create configuration errors.
pub fn config_error(kind: ConfigErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Config(kind),
    }
}
