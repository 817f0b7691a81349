use clap::builder::TypedValueParser as _;
use clap::{Args, Parser, Subcommand};
use domain::error::{DomainErrorKind, Error, InternalErrorKind};
use domain::location::{Coordinate, FixedPointCoordinate};
use domain::oauth_connection::{self, LinkedAccount};
use domain::rental_return::{self, ReturnDecision, ReturnPolicy};
use domain::{CallbackParams, FlowMode, MemorySessionStore, Tokens};
use log::*;
use service::config::{load_dotenv, Config};
use service::logging::Logger;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, Parser)]
#[command(author, version, about = "Club member sign-in and asset return tools", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in with Google, or link a Google account to the current member.
    ///
    /// Prints the authorization URL, then reads the URL the browser was
    /// redirected to from stdin.
    Login {
        #[arg(
            long,
            default_value = "login",
            value_parser = clap::builder::PossibleValuesParser::new(["link", "login"])
                .map(|s| s.parse::<FlowMode>().unwrap()),
        )]
        mode: FlowMode,
    },
    /// Check that the device is close enough to an asset's return point.
    CheckReturn(CheckReturnArgs),
}

#[derive(Debug, Args)]
struct CheckReturnArgs {
    /// Device latitude in degrees. Omit when the device has no location fix.
    #[arg(long, allow_negative_numbers = true, requires = "user_lng")]
    user_lat: Option<f64>,

    /// Device longitude in degrees.
    #[arg(long, allow_negative_numbers = true, requires = "user_lat")]
    user_lng: Option<f64>,

    /// Reference latitude as stored by the club API (degrees × 1,000,000).
    #[arg(long, allow_negative_numbers = true, requires = "ref_longitude_e6")]
    ref_latitude_e6: Option<i64>,

    /// Reference longitude as stored by the club API (degrees × 1,000,000).
    #[arg(long, allow_negative_numbers = true, requires = "ref_latitude_e6")]
    ref_longitude_e6: Option<i64>,

    /// What to do with an out-of-range reading.
    #[arg(
        long,
        default_value = "block",
        value_parser = clap::builder::PossibleValuesParser::new(["block", "inform"])
            .map(|s| s.parse::<ReturnPolicy>().unwrap()),
    )]
    policy: ReturnPolicy,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_dotenv();
    let cli = Cli::parse();
    Logger::init_logger(&cli.config)?;

    debug!("Running in {} environment", cli.config.runtime_env());

    match cli.command {
        Command::Login { mode } => match login(&cli.config, mode).await {
            Ok(account) => print_account(&account),
            Err(e) => {
                error!("Sign-in failed: {e}");
                eprintln!("{}", e.user_message());
                std::process::exit(1);
            }
        },
        Command::CheckReturn(args) => match check_return(&args) {
            Ok(decision) => {
                print_decision(&decision);
                if !decision.is_allowed() {
                    std::process::exit(2);
                }
            }
            Err(e) => {
                error!("Return check failed: {e}");
                std::process::exit(1);
            }
        },
    }

    Ok(())
}

async fn login(config: &Config, mode: FlowMode) -> Result<LinkedAccount, Error> {
    let manager = oauth_connection::flow_manager(config, Arc::new(MemorySessionStore::new()))?;
    let url = oauth_connection::begin(&manager, mode)?;

    println!("Open this URL in your browser to continue:\n\n  {url}\n");
    println!("Then paste the URL you were redirected to:");

    let callback_url = read_line().await?;
    let callback = CallbackParams::from_url(&callback_url)?;
    oauth_connection::complete_and_exchange(&manager, &callback).await
}

async fn read_line() -> Result<String, Error> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    match lines.next_line().await {
        Ok(Some(line)) => Ok(line),
        Ok(None) => Err(Error::invalid_input("no callback URL was entered")),
        Err(e) => Err(Error {
            source: Some(Box::new(e)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                "Failed to read the callback URL from stdin".to_string(),
            )),
        }),
    }
}

fn check_return(args: &CheckReturnArgs) -> Result<ReturnDecision, Error> {
    let user = match (args.user_lat, args.user_lng) {
        (Some(lat), Some(lng)) => Some(Coordinate::new(lat, lng)?),
        _ => None,
    };
    let reference = match (args.ref_latitude_e6, args.ref_longitude_e6) {
        (Some(lat), Some(lng)) => Some(FixedPointCoordinate::new(lat, lng)),
        _ => None,
    };
    rental_return::verify_return_location(user, reference, args.policy)
}

// Token values stay out of the output.
fn print_account(account: &LinkedAccount) {
    let tokens = &account.tokens;
    println!("Google {} succeeded", account.mode);
    println!("  token type:    {}", tokens.token_type);
    println!("  expires at:    {}", expiry_summary(tokens));
    println!("  refresh token: {}", tokens.refresh_token.is_some());
    println!("  id token:      {}", tokens.id_token.is_some());
    println!("  scopes:        {}", tokens.scopes.join(" "));
}

fn expiry_summary(tokens: &Tokens) -> String {
    match (tokens.expires_at, tokens.time_until_expiry()) {
        (Some(expires_at), Some(remaining)) => format!(
            "{} (in {} min)",
            expires_at.to_rfc3339(),
            remaining.num_minutes()
        ),
        _ => "unknown".to_string(),
    }
}

fn print_decision(decision: &ReturnDecision) {
    match decision {
        ReturnDecision::Skipped => println!("Location check skipped, return authorized"),
        ReturnDecision::Verified(check) => {
            println!("Return verified ({:.1} m away)", check.distance_meters)
        }
        ReturnDecision::Notice(check) => println!(
            "Notice: you are {:.1} m from the return point, return recorded anyway",
            check.distance_meters
        ),
        ReturnDecision::Rejected(check) => println!(
            "Return rejected: you are {:.1} m from the return point (max {} m)",
            check.distance_meters,
            domain::location::MAX_RETURN_DISTANCE_METERS
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use secrecy::SecretString;

    fn parse(args: &[&str]) -> Cli {
        let argv = std::iter::once("clubgear").chain(args.iter().copied());
        Cli::try_parse_from(argv).unwrap()
    }

    fn check_return_args(args: &[&str]) -> CheckReturnArgs {
        let mut argv = vec!["check-return"];
        argv.extend_from_slice(args);
        match parse(&argv).command {
            Command::CheckReturn(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    fn tokens_expiring_in(minutes: Option<i64>) -> Tokens {
        Tokens {
            access_token: SecretString::new("ya29.secret".to_string()),
            refresh_token: None,
            id_token: None,
            expires_at: minutes
                .map(|m| Utc::now() + Duration::minutes(m) + Duration::seconds(30)),
            token_type: "Bearer".to_string(),
            scopes: vec![],
        }
    }

    #[test]
    fn test_expiry_summary_shows_remaining_minutes() {
        let summary = expiry_summary(&tokens_expiring_in(Some(59)));
        assert!(summary.ends_with("(in 59 min)"), "got {}", summary);
        assert!(!summary.contains("ya29"));
        assert_eq!(expiry_summary(&tokens_expiring_in(None)), "unknown");
    }

    #[test]
    fn test_login_mode_defaults_to_login() {
        match parse(&["login"]).command {
            Command::Login { mode } => assert_eq!(mode, FlowMode::Login),
            other => panic!("unexpected command {other:?}"),
        }
        match parse(&["login", "--mode", "link"]).command {
            Command::Login { mode } => assert_eq!(mode, FlowMode::Link),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_config_flags_precede_subcommand() {
        let cli = parse(&["--app-origin", "https://club.example.com", "login"]);
        assert_eq!(cli.config.app_origin(), "https://club.example.com");
    }

    #[test]
    fn test_check_return_rejects_far_reading_under_block() {
        let args = check_return_args(&[
            "--user-lat",
            "37.4600",
            "--user-lng",
            "126.9526",
            "--ref-latitude-e6",
            "37459800",
            "--ref-longitude-e6",
            "126952600",
        ]);
        let decision = check_return(&args).unwrap();
        assert!(matches!(decision, ReturnDecision::Rejected(_)));
    }

    #[test]
    fn test_check_return_informs_under_inform_policy() {
        let args = check_return_args(&[
            "--user-lat",
            "-33.8570",
            "--user-lng",
            "151.2150",
            "--ref-latitude-e6",
            "-33856800",
            "--ref-longitude-e6",
            "151215300",
            "--policy",
            "inform",
        ]);
        let decision = check_return(&args).unwrap();
        assert!(matches!(decision, ReturnDecision::Notice(_)));
        assert!(decision.is_allowed());
    }

    #[test]
    fn test_check_return_without_reference_is_skipped() {
        let args = check_return_args(&["--user-lat", "37.46", "--user-lng", "126.95"]);
        assert_eq!(check_return(&args).unwrap(), ReturnDecision::Skipped);
    }

    #[test]
    fn test_check_return_rejects_half_a_reference() {
        let result = Cli::try_parse_from([
            "clubgear",
            "check-return",
            "--ref-latitude-e6",
            "37459800",
        ]);
        assert!(result.is_err());
    }
}
