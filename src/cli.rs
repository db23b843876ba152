//! Command-line interface for px-session.
//!
//! Uses lexopt for minimal binary size overhead.

use std::ffi::OsString;
use std::path::PathBuf;

/// Command-line arguments.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Session directory (overrides config file).
    pub dir: Option<PathBuf>,
    /// Signing secret (overrides config file).
    pub secret: Option<String>,
    /// Cookie name (overrides config file).
    pub cookie_name: Option<String>,
    /// Cookie lifetime in seconds (overrides config file).
    pub lifetime: Option<u64>,
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Incoming cookie value, as a client would send it.
    pub cookie: Option<String>,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
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
            Short('d') | Long("dir") => {
                result.dir = Some(parser.value()?.parse()?);
            }
            Short('s') | Long("secret") => {
                result.secret = Some(parser.value()?.parse()?);
            }
            Short('n') | Long("cookie-name") => {
                result.cookie_name = Some(parser.value()?.parse()?);
            }
            Short('t') | Long("lifetime") => {
                let value: String = parser.value()?.parse()?;
                let lifetime = value
                    .parse()
                    .map_err(|_| ArgsError::InvalidValue("lifetime", value))?;
                result.lifetime = Some(lifetime);
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('k') | Long("cookie") => {
                result.cookie = Some(parser.value()?.parse()?);
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
        r#"px-session {version}
Server-side sessions with signed tokens and sliding expiration.

Runs one request of a visit counter: opens the session named by --cookie,
increments "count", saves it and prints the cookie to send next time.

USAGE:
    px-session [OPTIONS]

OPTIONS:
    -d, --dir <PATH>           Session directory [default: system temp dir]
    -s, --secret <KEY>         Signing secret (unsigned tokens when omitted)
    -n, --cookie-name <NAME>   Cookie name [default: px.session]
    -t, --lifetime <SECS>      Cookie and session lifetime
    -c, --config <FILE>        Path to JSON configuration file
    -k, --cookie <VALUE>       Cookie value from a previous run
    -l, --log-level <LEVEL>    Log level (error, warn, info, debug, trace)
    -h, --help                 Print help
    -V, --version              Print version

ENVIRONMENT:
    PX_SESSION_DIR             Session directory
    PX_SESSION_SECRET          Signing secret
    PX_SESSION_COOKIE_NAME     Cookie name
    PX_SESSION_COOKIE_LIFETIME Cookie and session lifetime
    PX_SESSION_LOG_LEVEL       Log level (falls back to RUST_LOG)"#
    );
}

/// Print version.
pub fn print_version() {
    println!("px-session {}", env!("CARGO_PKG_VERSION"));
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
