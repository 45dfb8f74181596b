//! Local child-process backend.

use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::command::{CommandLine, Job};
use super::result::{ExecutionResult, Output};
use super::runner::RunnerOptions;
use super::stream::{InputFeeder, StreamCollector};
use crate::error::RunnerError;
use crate::Result;

/// Kills and reaps the child on every exit path that has not waited for it.
struct ChildGuard {
    child: Child,
    reaped: bool,
}

impl ChildGuard {
    fn new(child: Child) -> Self {
        Self {
            child,
            reaped: false,
        }
    }

    fn try_wait(&mut self) -> std::io::Result<Option<ExitStatus>> {
        let status = self.child.try_wait()?;
        if status.is_some() {
            self.reaped = true;
        }
        Ok(status)
    }

    fn terminate(&mut self) {
        if self.reaped {
            return;
        }
        let pid = self.child.id();
        if let Err(e) = self.child.kill() {
            debug!(pid, "kill failed: {}", e);
        }
        match self.child.wait() {
            Ok(status) => {
                debug!(pid, ?status, "child reaped");
                self.reaped = true;
            }
            Err(e) => warn!(pid, "failed to reap child: {}", e),
        }
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Runs commands as local child processes.
pub(crate) struct LocalRunner<'a> {
    options: &'a RunnerOptions,
}

impl<'a> LocalRunner<'a> {
    pub fn new(options: &'a RunnerOptions) -> Self {
        Self { options }
    }

    /// Spawn, feed, and wait for `job`.
    pub fn run(&self, job: Job) -> Result<ExecutionResult> {
        let start = Instant::now();
        let deadline = job.timeout.map(|t| start + t);

        let mut command = build_command(&job)?;
        let child = command.spawn().map_err(|source| RunnerError::Spawn {
            program: job.command.program().to_string(),
            source,
        })?;
        let mut guard = ChildGuard::new(child);
        let pid = guard.child.id();
        debug!(pid, command = %job.command, "spawned local command");

        let stdout = match guard.child.stdout.take() {
            Some(pipe) => Some(StreamCollector::spawn("stdout", pipe)?),
            None => None,
        };
        let stderr = match guard.child.stderr.take() {
            Some(pipe) => Some(StreamCollector::spawn("stderr", pipe)?),
            None => None,
        };

        let Job {
            command: command_line,
            input,
            timeout,
            check,
            text,
            cancel,
            ..
        } = job;

        let mut feeder = match guard.child.stdin.take() {
            Some(pipe) => Some(InputFeeder::spawn(
                input.into_reader(),
                pipe,
                self.options.input_chunk_size,
            )?),
            None => None,
        };

        let status = loop {
            if let Some(Err(e)) = feeder.as_mut().and_then(InputFeeder::poll) {
                warn!(pid, "writing input failed; killing child");
                guard.terminate();
                return Err(RunnerError::Io(e));
            }

            if let Some(status) = guard.try_wait()? {
                break status;
            }

            if cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
                warn!(pid, "cancelled; killing child");
                guard.terminate();
                return Err(RunnerError::Cancelled {
                    command: command_line,
                });
            }

            if deadline.is_some_and(|d| Instant::now() >= d) {
                warn!(pid, ?timeout, "timed out; killing child");
                guard.terminate();
                return Err(self.timeout_error(command_line, timeout, stdout, stderr, text));
            }

            thread::sleep(self.sleep_interval(deadline));
        };

        let exit_code = exit_code(status);
        debug!(pid, exit_code, "local command exited");

        // A grandchild may still hold a pipe open; the deadline still applies.
        let mut drained = true;
        for collector in [&stdout, &stderr].into_iter().flatten() {
            match collector.wait(self.exit_drain_limit(deadline)) {
                Some(Ok(())) => {}
                Some(Err(e)) => return Err(RunnerError::Io(e)),
                None => {
                    drained = false;
                    break;
                }
            }
        }
        if !drained {
            warn!(pid, "output still open at deadline");
            return Err(self.timeout_error(command_line, timeout, stdout, stderr, text));
        }

        if let Some(feeder) = feeder.as_mut() {
            match feeder.wait(Some(self.options.drain_timeout)) {
                Some(Err(e)) => return Err(RunnerError::Io(e)),
                None if !feeder.is_finished() => {
                    debug!(pid, "input writer still busy after exit")
                }
                _ => {}
            }
        }

        let result = ExecutionResult::new(
            command_line,
            exit_code,
            stdout.map(|c| Output::from_bytes(c.take(), text)),
            stderr.map(|c| Output::from_bytes(c.take(), text)),
            start.elapsed(),
        );

        if check && !result.success() {
            return Err(result.into_failure());
        }
        Ok(result)
    }

    /// Build the timeout error from whatever output is left after the kill.
    fn timeout_error(
        &self,
        command: CommandLine,
        timeout: Option<Duration>,
        stdout: Option<StreamCollector>,
        stderr: Option<StreamCollector>,
        text: bool,
    ) -> RunnerError {
        let drain = |collector: StreamCollector| {
            if collector.wait(Some(self.options.drain_timeout)).is_none() {
                debug!("partial output drain hit its limit");
            }
            Output::from_bytes(collector.take(), text)
        };

        RunnerError::Timeout {
            command,
            timeout,
            stdout: stdout.map(&drain),
            stderr: stderr.map(&drain),
        }
    }

    /// Limit for collecting output once the child has exited in time.
    ///
    /// Never shorter than one poll interval, so a child that exits right
    /// before its deadline still gets its output read.
    fn exit_drain_limit(&self, deadline: Option<Instant>) -> Option<Duration> {
        remaining(deadline).map(|left| left.max(self.options.poll_interval))
    }

    fn sleep_interval(&self, deadline: Option<Instant>) -> Duration {
        match remaining(deadline) {
            Some(left) => self.options.poll_interval.min(left),
            None => self.options.poll_interval,
        }
    }
}

fn remaining(deadline: Option<Instant>) -> Option<Duration> {
    deadline.map(|d| d.saturating_duration_since(Instant::now()))
}

fn build_command(job: &Job) -> Result<Command> {
    let mut command = match &job.command {
        CommandLine::Args(args) => {
            let (program, rest) = args
                .split_first()
                .ok_or_else(|| RunnerError::Config("empty command".into()))?;
            let mut c = Command::new(program);
            c.args(rest);
            c
        }
        CommandLine::Shell(line) => shell_command(line),
    };

    command
        .stdin(Stdio::piped())
        .stdout(job.stdout.to_stdio())
        .stderr(job.stderr.to_stdio());

    if let Some(dir) = &job.working_dir {
        command.current_dir(dir);
    }
    command.envs(&job.env);

    Ok(command)
}

#[cfg(unix)]
fn shell_command(line: &str) -> Command {
    let mut c = Command::new("/bin/sh");
    c.arg("-c").arg(line);
    c
}

#[cfg(windows)]
fn shell_command(line: &str) -> Command {
    let mut c = Command::new("cmd.exe");
    c.arg("/C").arg(line);
    c
}

/// Exit code, or the negated signal number for a child killed by a signal.
#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|sig| -sig))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}
