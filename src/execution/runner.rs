//! Command runner: backend selection and result checking.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::debug;

use super::command::{ExecutionRequest, Input, Job, StreamMode};
use super::local::LocalRunner;
use super::remote::RemoteRunner;
use super::result::ExecutionResult;
use crate::error::RunnerError;
use crate::output::Record;
use crate::session::RemoteSession;
use crate::Result;

/// Size of the chunks input is written in.
pub const INPUT_CHUNK_SIZE: usize = 128 * 1024;

/// How often a local child is polled for exit.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long to wait for output after killing a timed out child.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Tunables shared by both backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerOptions {
    /// Timeout for requests that do not set one.
    pub default_timeout: Option<Duration>,
    /// Exit polling interval for local children.
    pub poll_interval: Duration,
    /// Limit on the best-effort drain after a local timeout.
    pub drain_timeout: Duration,
    /// Input is written in chunks of at most this many bytes.
    pub input_chunk_size: usize,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            default_timeout: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            input_chunk_size: INPUT_CHUNK_SIZE,
        }
    }
}

/// Runs commands locally or over a remote session.
///
/// The runner holds no connection state and can be cloned freely.
///
/// # Example
///
/// ```no_run
/// use zfs_exec::{CommandRunner, ExecutionRequest, RunnerError};
///
/// let runner = CommandRunner::new();
/// match runner.run_checked(ExecutionRequest::new(["zfs", "list", "-H", "-o", "name,used"])) {
///     Ok(Some(records)) => {
///         for record in records {
///             println!("{} uses {}", record[0], record[1]);
///         }
///     }
///     Ok(None) => {}
///     Err(RunnerError::Classified(e)) => eprintln!("{} ({})", e, e.kind.code()),
///     Err(e) => eprintln!("zfs failed: {}", e),
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct CommandRunner {
    options: RunnerOptions,
}

impl CommandRunner {
    /// Create a runner with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a runner with the given options.
    pub fn with_options(options: RunnerOptions) -> Self {
        Self { options }
    }

    /// The runner's options.
    pub fn options(&self) -> &RunnerOptions {
        &self.options
    }

    /// Execute a request and return its result.
    ///
    /// A non-zero exit is only an error when the request sets
    /// [`check`](ExecutionRequest::check), and then always the generic
    /// [`RunnerError::Failed`].
    pub fn run(&self, request: ExecutionRequest) -> Result<ExecutionResult> {
        let (job, session) = self.prepare(request)?;
        self.dispatch(job, session)
    }

    /// Execute a request that produces tabular output and decode it.
    ///
    /// Standard output and standard error are always captured as text; the
    /// request may not route them or choose a decoding mode. Failures are
    /// classified first and fall back to [`RunnerError::Failed`].
    pub fn run_checked(&self, request: ExecutionRequest) -> Result<Option<Vec<Record>>> {
        let request = Self::fix_capture(request)?;
        let result = self.run(request)?.check_returncode()?;
        Ok(result.records())
    }

    /// Async version of [`run`](Self::run) on the blocking thread pool.
    ///
    /// Dropping the returned future cancels the request: a local child is
    /// killed and reaped as if its cancellation token had fired.
    pub async fn run_async(&self, request: ExecutionRequest) -> Result<ExecutionResult> {
        let runner = self.clone();
        let (request, _guard) = Self::link_cancel(request);
        tokio::task::spawn_blocking(move || runner.run(request))
            .await
            .map_err(|e| RunnerError::Join(e.to_string()))?
    }

    /// Async version of [`run_checked`](Self::run_checked).
    ///
    /// Dropping the returned future cancels the request.
    pub async fn run_checked_async(
        &self,
        request: ExecutionRequest,
    ) -> Result<Option<Vec<Record>>> {
        let runner = self.clone();
        let (request, _guard) = Self::link_cancel(request);
        tokio::task::spawn_blocking(move || runner.run_checked(request))
            .await
            .map_err(|e| RunnerError::Join(e.to_string()))?
    }

    /// Give the request a token that fires when the returned guard drops.
    ///
    /// A token already on the request still cancels through the child token.
    fn link_cancel(mut request: ExecutionRequest) -> (ExecutionRequest, DropGuard) {
        let token = request
            .cancel
            .as_ref()
            .map(CancellationToken::child_token)
            .unwrap_or_default();
        request.cancel = Some(token.clone());
        (request, token.drop_guard())
    }

    /// Reject overrides of the fixed capture settings, then apply them.
    fn fix_capture(mut request: ExecutionRequest) -> Result<ExecutionRequest> {
        if request.stdout.is_some() {
            return Err(RunnerError::Config(
                "stdout may not be set, it is always captured".into(),
            ));
        }
        if request.stderr.is_some() {
            return Err(RunnerError::Config(
                "stderr may not be set, it is always captured".into(),
            ));
        }
        if request.text.is_some() {
            return Err(RunnerError::Config(
                "text mode may not be set, output is always decoded as text".into(),
            ));
        }

        request.stdout = Some(StreamMode::Capture);
        request.stderr = Some(StreamMode::Capture);
        request.text = Some(true);
        // Failures are classified by the caller of `run`.
        request.check = false;
        Ok(request)
    }

    fn prepare(
        &self,
        request: ExecutionRequest,
    ) -> Result<(Job, Option<Arc<dyn RemoteSession>>)> {
        if request.command.is_empty() {
            return Err(RunnerError::Config("empty command".into()));
        }
        if request.session.is_some() {
            if request.working_dir.is_some() {
                return Err(RunnerError::Config(
                    "working_dir is not supported for remote execution".into(),
                ));
            }
            if !request.env.is_empty() {
                return Err(RunnerError::Config(
                    "env is not supported for remote execution".into(),
                ));
            }
            let routed = [request.stdout, request.stderr]
                .into_iter()
                .flatten()
                .any(|mode| mode != StreamMode::Capture);
            if routed {
                return Err(RunnerError::Config(
                    "remote output is always captured".into(),
                ));
            }
        }

        let text = request.text.unwrap_or(false);
        let default_mode = if request.session.is_some() {
            StreamMode::Capture
        } else {
            StreamMode::Inherit
        };
        let job = Job {
            command: request.command,
            // No input and empty input behave the same.
            input: request.input.unwrap_or_else(|| Input::empty(text)),
            timeout: request.timeout.or(self.options.default_timeout),
            check: request.check,
            stdout: request.stdout.unwrap_or(default_mode),
            stderr: request.stderr.unwrap_or(default_mode),
            text,
            working_dir: request.working_dir,
            env: request.env,
            cancel: request.cancel,
        };

        Ok((job, request.session))
    }

    fn dispatch(&self, job: Job, session: Option<Arc<dyn RemoteSession>>) -> Result<ExecutionResult> {
        match session {
            Some(session) => {
                debug!(command = %job.command, "dispatching to remote session");
                RemoteRunner::new(&self.options).run(session.as_ref(), job)
            }
            None => {
                debug!(command = %job.command, "dispatching to local process");
                LocalRunner::new(&self.options).run(job)
            }
        }
    }
}
