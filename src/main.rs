//! zfs-exec binary entry point.

use std::io::{IsTerminal, Write};
use std::process::ExitCode;

use tracing::debug;
use zfs_exec::cli::{self, Args};
use zfs_exec::config::Config;
use zfs_exec::{logging, CommandRunner, ExecutionRequest, Input, RunnerError};

/// Exit status used when the command timed out, as with timeout(1).
const EXIT_TIMEOUT: u8 = 124;

#[tokio::main]
async fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("zfs-exec: {}", e);
            eprintln!("Try 'zfs-exec --help' for more information.");
            return ExitCode::from(2);
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }
    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("zfs-exec: {}", e);
            return ExitCode::from(2);
        }
    };
    let options = match config.to_runner_options() {
        Ok(options) => options,
        Err(e) => {
            eprintln!("zfs-exec: {}", e);
            return ExitCode::from(2);
        }
    };

    let _ = logging::try_init_with(config.log_filter());
    debug!(?options, "runner configured");

    let runner = CommandRunner::with_options(options);
    match execute(&runner, args).await {
        Ok(code) => code,
        Err(e) => {
            debug!(error = %e, "command failed");
            eprintln!("zfs-exec: {}", e);
            ExitCode::from(failure_status(&e))
        }
    }
}

async fn execute(runner: &CommandRunner, args: Args) -> zfs_exec::Result<ExitCode> {
    let mut request = ExecutionRequest::new(args.command);
    let stdin = std::io::stdin();
    if !stdin.is_terminal() {
        request = request.input(Input::reader(stdin));
    }

    if args.tabular {
        let records = runner.run_checked_async(request).await?.unwrap_or_default();
        let mut out = std::io::stdout().lock();
        for record in records {
            let line = serde_json::to_string(&record)
                .map_err(|e| RunnerError::Io(std::io::Error::other(e)))?;
            writeln!(out, "{}", line)?;
        }
        out.flush()?;
        return Ok(ExitCode::SUCCESS);
    }

    let result = runner.run_async(request).await?;
    Ok(ExitCode::from(exit_status(result.exit_code())))
}

/// Map a child exit code to a process status, shell style for signals.
fn exit_status(code: i32) -> u8 {
    if code < 0 {
        (128 + code.unsigned_abs()).min(255) as u8
    } else {
        code.min(255) as u8
    }
}

fn failure_status(err: &RunnerError) -> u8 {
    if err.is_timeout() {
        return EXIT_TIMEOUT;
    }
    match err.exit_code() {
        Some(code) if code != 0 => exit_status(code),
        _ => 1,
    }
}
