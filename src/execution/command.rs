//! Command requests and their building blocks.

use std::collections::HashMap;
use std::fmt;
use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::session::RemoteSession;

/// The command to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
    /// Program followed by its arguments.
    ///
    /// Spawned directly on the local host; joined with single spaces when
    /// sent to a remote session.
    Args(Vec<String>),
    /// A single command string.
    ///
    /// Run through the platform shell on the local host; sent verbatim to a
    /// remote session.
    Shell(String),
}

impl CommandLine {
    /// Create an argument-vector command.
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Args(args.into_iter().map(Into::into).collect())
    }

    /// Create a single-string command.
    pub fn shell(line: impl Into<String>) -> Self {
        Self::Shell(line.into())
    }

    /// Whether there is nothing to execute.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Args(args) => args.is_empty(),
            Self::Shell(line) => line.trim().is_empty(),
        }
    }

    /// The program name, for error messages.
    pub fn program(&self) -> &str {
        match self {
            Self::Args(args) => args.first().map(String::as_str).unwrap_or_default(),
            Self::Shell(line) => line,
        }
    }

    /// The command string sent to a remote session.
    ///
    /// Arguments are joined with single spaces and not escaped; quoting is
    /// left to the remote side.
    pub fn to_remote_string(&self) -> String {
        match self {
            Self::Args(args) => args.join(" "),
            Self::Shell(line) => line.clone(),
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_remote_string())
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for CommandLine {
    fn from(args: [S; N]) -> Self {
        Self::new(args)
    }
}

impl From<Vec<String>> for CommandLine {
    fn from(args: Vec<String>) -> Self {
        Self::Args(args)
    }
}

impl From<Vec<&str>> for CommandLine {
    fn from(args: Vec<&str>) -> Self {
        Self::new(args)
    }
}

/// Data fed to the command's standard input.
pub enum Input {
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// A stream copied to the command in chunks.
    Reader(Box<dyn Read + Send>),
}

impl Input {
    /// An empty payload of the given kind.
    pub fn empty(text: bool) -> Self {
        if text {
            Self::Text(String::new())
        } else {
            Self::Bytes(Vec::new())
        }
    }

    /// Create a streaming input.
    pub fn reader(reader: impl Read + Send + 'static) -> Self {
        Self::Reader(Box::new(reader))
    }

    /// Whether this is a text payload.
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    pub(crate) fn into_reader(self) -> Box<dyn Read + Send> {
        match self {
            Self::Text(text) => Box::new(Cursor::new(text.into_bytes())),
            Self::Bytes(bytes) => Box::new(Cursor::new(bytes)),
            Self::Reader(reader) => reader,
        }
    }
}

impl fmt::Debug for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(&text.len()).finish(),
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}

impl From<String> for Input {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Input {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Input {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for Input {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

/// Where a local output stream goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamMode {
    /// Collect into the result.
    Capture,
    /// Share the parent's stream.
    #[default]
    Inherit,
    /// Discard.
    Null,
}

impl StreamMode {
    pub(crate) fn to_stdio(self) -> Stdio {
        match self {
            Self::Capture => Stdio::piped(),
            Self::Inherit => Stdio::inherit(),
            Self::Null => Stdio::null(),
        }
    }
}

/// A single command execution request.
///
/// Without a session the command runs on the local host. With one, it runs
/// on the remote side of that session.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use zfs_exec::execution::{ExecutionRequest, StreamMode};
///
/// let request = ExecutionRequest::new(["zfs", "list", "-H", "-o", "name"])
///     .timeout(Duration::from_secs(10))
///     .stdout(StreamMode::Capture)
///     .text(true);
/// assert_eq!(request.command().to_string(), "zfs list -H -o name");
/// ```
pub struct ExecutionRequest {
    pub(crate) command: CommandLine,
    pub(crate) input: Option<Input>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) check: bool,
    pub(crate) stdout: Option<StreamMode>,
    pub(crate) stderr: Option<StreamMode>,
    pub(crate) text: Option<bool>,
    pub(crate) working_dir: Option<PathBuf>,
    pub(crate) env: HashMap<String, String>,
    pub(crate) session: Option<Arc<dyn RemoteSession>>,
    pub(crate) cancel: Option<CancellationToken>,
}

impl ExecutionRequest {
    /// Create a request for a program and its arguments.
    pub fn new(command: impl Into<CommandLine>) -> Self {
        Self {
            command: command.into(),
            input: None,
            timeout: None,
            check: false,
            stdout: None,
            stderr: None,
            text: None,
            working_dir: None,
            env: HashMap::new(),
            session: None,
            cancel: None,
        }
    }

    /// Create a request for a single command string.
    pub fn shell(line: impl Into<String>) -> Self {
        Self::new(CommandLine::shell(line))
    }

    /// The command to execute.
    pub fn command(&self) -> &CommandLine {
        &self.command
    }

    /// Set the standard input payload.
    ///
    /// `None` is the same as an empty payload.
    pub fn input(mut self, input: impl Into<Option<Input>>) -> Self {
        self.input = input.into();
        self
    }

    /// Set the execution timeout.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Fail with [`RunnerError::Failed`](crate::RunnerError::Failed) on a
    /// non-zero exit.
    pub fn check(mut self, check: bool) -> Self {
        self.check = check;
        self
    }

    /// Route standard output (local execution only).
    pub fn stdout(mut self, mode: StreamMode) -> Self {
        self.stdout = Some(mode);
        self
    }

    /// Route standard error (local execution only).
    pub fn stderr(mut self, mode: StreamMode) -> Self {
        self.stderr = Some(mode);
        self
    }

    /// Decode captured output as text instead of bytes.
    pub fn text(mut self, text: bool) -> Self {
        self.text = Some(text);
        self
    }

    /// Set the working directory (local execution only).
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Add an environment variable (local execution only).
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Add multiple environment variables (local execution only).
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in vars {
            self.env.insert(k.into(), v.into());
        }
        self
    }

    /// Run over an already connected remote session.
    pub fn session(mut self, session: Arc<dyn RemoteSession>) -> Self {
        self.session = Some(session);
        self
    }

    /// Abort the wait when `token` is cancelled.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Whether the request targets a remote session.
    pub fn is_remote(&self) -> bool {
        self.session.is_some()
    }
}

impl fmt::Debug for ExecutionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionRequest")
            .field("command", &self.command)
            .field("input", &self.input)
            .field("timeout", &self.timeout)
            .field("check", &self.check)
            .field("stdout", &self.stdout)
            .field("stderr", &self.stderr)
            .field("text", &self.text)
            .field("working_dir", &self.working_dir)
            .field("env", &self.env)
            .field("remote", &self.session.is_some())
            .finish()
    }
}

/// A validated request with every default resolved.
#[derive(Debug)]
pub(crate) struct Job {
    pub command: CommandLine,
    pub input: Input,
    pub timeout: Option<Duration>,
    pub check: bool,
    pub stdout: StreamMode,
    pub stderr: StreamMode,
    pub text: bool,
    pub working_dir: Option<PathBuf>,
    pub env: HashMap<String, String>,
    pub cancel: Option<CancellationToken>,
}

impl Job {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }
}
