//! Command-line interface for `zfs-exec`.

use std::ffi::OsString;
use std::path::PathBuf;

use thiserror::Error;

/// Command-line arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    /// Timeout in seconds.
    pub timeout: Option<u64>,
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Log level or filter directive.
    pub log_level: Option<String>,
    /// Capture output and print it as JSON records.
    pub tabular: bool,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
    /// The command and its arguments.
    pub command: Vec<String>,
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
///
/// Options are only recognized before the command; everything from the first
/// positional argument on belongs to the command.
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
            Short('t') | Long("timeout") => {
                let value: String = parser.value()?.parse()?;
                let secs = value
                    .parse()
                    .map_err(|_| ArgsError::InvalidValue("timeout", value))?;
                result.timeout = Some(secs);
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Long("tabular") => {
                result.tabular = true;
            }
            Value(program) => {
                result.command.push(into_string(program)?);
                for arg in parser.raw_args()? {
                    result.command.push(into_string(arg)?);
                }
                break;
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    if result.command.is_empty() && !result.help && !result.version {
        return Err(ArgsError::MissingCommand);
    }

    Ok(result)
}

fn into_string(arg: OsString) -> Result<String, ArgsError> {
    arg.into_string()
        .map_err(|arg| ArgsError::InvalidValue("command", arg.to_string_lossy().into_owned()))
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"zfs-exec {version}
Run zfs and zpool commands with timeouts and error classification

USAGE:
    zfs-exec [OPTIONS] [--] <COMMAND>...

OPTIONS:
    -t, --timeout <SECS>    Kill the command after SECS seconds
    -c, --config <FILE>     Path to configuration file (JSON)
    -l, --log-level <LVL>   Log level (error, warn, info, debug, trace)
        --tabular           Capture output and print one JSON array per line
    -h, --help              Print help
    -V, --version           Print version

ENVIRONMENT VARIABLES:
    ZFS_EXEC_TIMEOUT        Default timeout in seconds (overrides config)
    ZFS_EXEC_LOG_LEVEL      Log level (overrides config)
    RUST_LOG                Alternative log level setting

EXAMPLES:
    # List datasets as records
    zfs-exec --tabular -- zfs list -H -o name,used

    # Scrub with a one hour limit
    zfs-exec -t 3600 zpool scrub -w tank
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("zfs-exec {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug, Error)]
pub enum ArgsError {
    #[error(transparent)]
    Lexopt(#[from] lexopt::Error),

    #[error("invalid value for --{0}: '{1}'")]
    InvalidValue(&'static str, String),

    #[error("no command given")]
    MissingCommand,
}
