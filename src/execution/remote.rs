//! Remote session backend.
//!
//! Unlike the local backend, a transport timeout leaves nothing to recover:
//! the [`RunnerError::Timeout`] it produces always has `stdout` and `stderr`
//! set to `None`.
//!
//! Both streams are always captured. They decode as text or bytes following
//! the request's `text` setting.

use std::io::{self, Read};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::command::{CommandLine, Job};
use super::result::{ExecutionResult, Output};
use super::runner::RunnerOptions;
use super::stream::{copy_chunked, CopyError};
use crate::error::RunnerError;
use crate::session::{RemoteChannel, RemoteSession};
use crate::Result;

/// Runs commands over a caller-owned [`RemoteSession`].
pub(crate) struct RemoteRunner<'a> {
    options: &'a RunnerOptions,
}

impl<'a> RemoteRunner<'a> {
    pub fn new(options: &'a RunnerOptions) -> Self {
        Self { options }
    }

    /// Execute `job` on `session`.
    pub fn run(&self, session: &dyn RemoteSession, job: Job) -> Result<ExecutionResult> {
        if job.is_cancelled() {
            return Err(RunnerError::Cancelled {
                command: job.command,
            });
        }

        let start = Instant::now();
        let line = job.command.to_remote_string();
        debug!(command = %line, timeout = ?job.timeout, "executing remote command");

        let transport = |e: io::Error| transport_error(e, &job.command, job.timeout);

        let mut channel = session
            .exec_command(&line, job.timeout)
            .map_err(transport)?;

        let (exit_code, stdout, stderr) = self
            .exchange(&mut *channel, job.input.into_reader())
            .map_err(|e| match e {
                Exchange::Input(e) => RunnerError::Io(e),
                Exchange::Transport(e) => transport(e),
            })?;
        debug!(exit_code, "remote command exited");

        let result = ExecutionResult::new(
            job.command.clone(),
            exit_code,
            Some(Output::from_bytes(stdout, job.text)),
            Some(Output::from_bytes(stderr, job.text)),
            start.elapsed(),
        );

        if job.check && !result.success() {
            return Err(result.into_failure());
        }
        Ok(result)
    }

    /// Send input, wait for the exit status, then read both streams.
    fn exchange(
        &self,
        channel: &mut dyn RemoteChannel,
        mut input: Box<dyn Read + Send>,
    ) -> std::result::Result<(i32, Vec<u8>, Vec<u8>), Exchange> {
        match copy_chunked(&mut *input, channel.stdin(), self.options.input_chunk_size) {
            Ok(n) => debug!(bytes = n, "remote input sent"),
            Err(CopyError::Read(e)) => return Err(Exchange::Input(e)),
            Err(CopyError::Write(e)) => return Err(Exchange::Transport(e)),
        }
        channel.close_stdin().map_err(Exchange::Transport)?;

        let exit_code = channel.recv_exit_status().map_err(Exchange::Transport)?;

        let mut stdout = Vec::new();
        channel
            .stdout()
            .read_to_end(&mut stdout)
            .map_err(Exchange::Transport)?;
        let mut stderr = Vec::new();
        channel
            .stderr()
            .read_to_end(&mut stderr)
            .map_err(Exchange::Transport)?;

        Ok((exit_code, stdout, stderr))
    }
}

enum Exchange {
    /// The caller's input reader failed.
    Input(io::Error),
    /// The session failed.
    Transport(io::Error),
}

fn transport_error(e: io::Error, command: &CommandLine, timeout: Option<Duration>) -> RunnerError {
    match e.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
            warn!(command = %command, "remote command timed out");
            RunnerError::Timeout {
                command: command.clone(),
                timeout,
                stdout: None,
                stderr: None,
            }
        }
        _ => RunnerError::Transport(e),
    }
}
