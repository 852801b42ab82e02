//! Command-line interface for the ride-request demo.
//!
//! Uses lexopt for minimal binary size overhead.

use std::ffi::OsString;
use std::path::PathBuf;

use crate::ride::RideTier;

/// Command-line arguments.
#[derive(Debug, Clone)]
pub struct Args {
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Pickup location.
    pub pickup: Option<String>,
    /// Destination.
    pub destination: Option<String>,
    /// Tier to book.
    pub tier: RideTier,
    /// Rider to sign in as.
    pub user: String,
    /// Skip simulated provider latency.
    pub instant: bool,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            config: None,
            pickup: None,
            destination: None,
            tier: RideTier::Economy,
            user: "rider@example.com".to_string(),
            instant: false,
            log_level: None,
            version: false,
            help: false,
        }
    }
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('p') | Long("pickup") => {
                result.pickup = Some(parser.value()?.parse()?);
            }
            Short('d') | Long("destination") => {
                result.destination = Some(parser.value()?.parse()?);
            }
            Short('t') | Long("tier") => {
                let value: String = parser.value()?.parse()?;
                result.tier = value
                    .parse()
                    .map_err(|_| ArgsError::InvalidValue("tier", value))?;
            }
            Short('u') | Long("user") => {
                let value: String = parser.value()?.parse()?;
                if value.trim().is_empty() {
                    return Err(ArgsError::InvalidValue("user", value));
                }
                result.user = value;
            }
            Long("instant") => {
                result.instant = true;
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Value(val) => {
                return Err(ArgsError::UnexpectedArgument(val.to_string_lossy().into()));
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"ride-request {version}
Request, select and confirm a ride against simulated providers

USAGE:
    ride-request --pickup <PLACE> --destination <PLACE> [OPTIONS]

OPTIONS:
    -p, --pickup <PLACE>       Pickup location
    -d, --destination <PLACE>  Destination
    -t, --tier <TIER>          Ride tier: economy, premium, luxury [default: economy]
    -u, --user <EMAIL>         Rider to sign in as [default: rider@example.com]
    -c, --config <FILE>        Path to configuration file (JSON)
    -l, --log-level <LVL>      Log level (error, warn, info, debug, trace)
        --instant              Skip simulated provider latency
    -h, --help                 Print help
    -V, --version              Print version

ENVIRONMENT VARIABLES:
    RIDE_REQUEST_LOG_LEVEL         Log level (overrides config)
    RIDE_REQUEST_SEARCH_DELAY_MS   Simulated search latency (overrides config)
    RIDE_REQUEST_CONFIRM_DELAY_MS  Simulated confirmation latency (overrides config)
    RUST_LOG                       Alternative log level setting

EXAMPLES:
    # Book an economy ride
    ride-request -p "Main St" -d "Airport"

    # Book a luxury ride without waiting
    ride-request -p "Main St" -d "Airport" -t luxury --instant
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("ride-request {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
    /// Unexpected positional argument.
    UnexpectedArgument(String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for --{}: '{}'", name, value)
            }
            Self::UnexpectedArgument(arg) => {
                write!(f, "unexpected argument: '{}'", arg)
            }
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}
