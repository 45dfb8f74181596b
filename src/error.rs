//! Error types for zfs-exec.

use std::time::Duration;

use thiserror::Error;

use crate::classify::ClassifiedError;
use crate::execution::{CommandLine, Output};

/// Main error type for command execution.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// The request asked for something the runner does not allow.
    ///
    /// Always raised before any process or session is touched.
    #[error("invalid request: {0}")]
    Config(String),

    /// The command exceeded its deadline.
    ///
    /// Local execution carries whatever output could be drained after the
    /// child was killed. Remote execution never has partial output: both
    /// streams are `None`.
    #[error("command '{command}' timed out{}", timeout_suffix(.timeout))]
    Timeout {
        command: CommandLine,
        timeout: Option<Duration>,
        stdout: Option<Output>,
        stderr: Option<Output>,
    },

    /// A recognized ZFS failure.
    #[error(transparent)]
    Classified(#[from] ClassifiedError),

    /// Non-zero exit that did not match a known failure.
    #[error("command '{command}' returned non-zero exit status {exit_code}")]
    Failed {
        command: CommandLine,
        exit_code: i32,
        stdout: Option<Output>,
        stderr: Option<Output>,
    },

    /// The request's cancellation token fired while waiting.
    #[error("command '{command}' was cancelled")]
    Cancelled { command: CommandLine },

    /// The local program could not be started.
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Local I/O error, including errors from the caller's input reader.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error raised by the remote session transport.
    #[error("remote transport error: {0}")]
    Transport(#[source] std::io::Error),

    /// The blocking task behind an async call did not complete.
    #[error("execution task failed: {0}")]
    Join(String),
}

fn timeout_suffix(timeout: &Option<Duration>) -> String {
    match timeout {
        Some(t) => format!(" after {:.3}s", t.as_secs_f64()),
        None => String::new(),
    }
}

impl RunnerError {
    /// The classified failure, if this is one.
    pub fn classified(&self) -> Option<&ClassifiedError> {
        match self {
            Self::Classified(e) => Some(e),
            _ => None,
        }
    }

    /// Whether this error is a timeout from either backend.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Exit code of a generic failure.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Failed { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }

    /// Captured standard output carried by the error, if any.
    pub fn stdout(&self) -> Option<&Output> {
        match self {
            Self::Timeout { stdout, .. } | Self::Failed { stdout, .. } => stdout.as_ref(),
            _ => None,
        }
    }

    /// Captured standard error carried by the error, if any.
    pub fn stderr(&self) -> Option<&Output> {
        match self {
            Self::Timeout { stderr, .. } | Self::Failed { stderr, .. } => stderr.as_ref(),
            _ => None,
        }
    }
}

/// Convenience Result type for zfs-exec operations.
pub type Result<T> = std::result::Result<T, RunnerError>;
