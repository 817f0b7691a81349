use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::fmt;
use std::str::FromStr;

/// Default origin the club web app is served from.
pub const DEFAULT_APP_ORIGIN: &str = "http://localhost:3000";

/// Default Google OAuth 2.0 authorization endpoint.
pub const DEFAULT_GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Default Google OAuth 2.0 token endpoint.
/// Override in tests to point at a mock server.
pub const DEFAULT_GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

/// Loads a `.env` file from the working directory (or a parent) into the
/// process environment. A missing file is not an error.
pub fn load_dotenv() {
    dotenv().ok();
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// The OAuth 2.0 client ID registered with Google for member sign-in.
    #[arg(long, env)]
    google_client_id: Option<String>,

    /// The OAuth 2.0 client secret, sent to the token endpoint only when set.
    #[arg(long, env, hide_env_values = true)]
    google_client_secret: Option<String>,

    /// The origin (scheme, host and port) of the club web app. The OAuth
    /// redirect URI is derived from it.
    #[arg(long, env, default_value = DEFAULT_APP_ORIGIN)]
    app_origin: String,

    /// Google's OAuth 2.0 authorization endpoint.
    #[arg(long, env, default_value = DEFAULT_GOOGLE_AUTH_URL)]
    google_auth_url: String,

    /// Google's OAuth 2.0 token endpoint.
    #[arg(long, env, default_value = DEFAULT_GOOGLE_TOKEN_URL)]
    google_token_url: String,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,
}

impl Config {
    /// Returns the Google OAuth client ID, if configured and non-empty.
    pub fn google_client_id(&self) -> Option<String> {
        self.google_client_id
            .clone()
            .filter(|id| !id.trim().is_empty())
    }

    /// Returns the Google OAuth client secret, if configured.
    pub fn google_client_secret(&self) -> Option<String> {
        self.google_client_secret.clone()
    }

    pub fn set_google_client_id(mut self, client_id: Option<String>) -> Self {
        self.google_client_id = client_id;
        self
    }

    pub fn set_google_token_url(mut self, token_url: String) -> Self {
        self.google_token_url = token_url;
        self
    }

    pub fn app_origin(&self) -> &str {
        &self.app_origin
    }

    pub fn google_auth_url(&self) -> &str {
        &self.google_auth_url
    }

    pub fn google_token_url(&self) -> &str {
        &self.google_token_url
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        self.runtime_env() == RustEnv::Production
    }
}
