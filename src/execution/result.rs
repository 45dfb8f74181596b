//! Execution result types.

use std::borrow::Cow;
use std::time::Duration;

use super::command::CommandLine;
use crate::classify::classify;
use crate::error::RunnerError;
use crate::output::{decode, Record};
use crate::Result;

/// Captured contents of an output stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// Decoded as UTF-8 (lossy).
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
}

impl Output {
    /// Wrap captured bytes, decoding them when `text` is set.
    pub fn from_bytes(bytes: Vec<u8>, text: bool) -> Self {
        if text {
            match String::from_utf8(bytes) {
                Ok(s) => Self::Text(s),
                Err(e) => Self::Text(String::from_utf8_lossy(e.as_bytes()).into_owned()),
            }
        } else {
            Self::Bytes(bytes)
        }
    }

    /// The contents as text, decoding bytes lossily.
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(s) => Cow::Borrowed(s),
            Self::Bytes(b) => String::from_utf8_lossy(b),
        }
    }

    /// The raw contents.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(s) => s.as_bytes(),
            Self::Bytes(b) => b,
        }
    }

    /// Whether nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

/// Result of a completed command.
///
/// A non-zero exit code is not an error by itself; see
/// [`check_returncode`](Self::check_returncode).
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    command: CommandLine,
    exit_code: i32,
    stdout: Option<Output>,
    stderr: Option<Output>,
    duration: Duration,
}

impl ExecutionResult {
    /// Create a new execution result.
    pub fn new(
        command: CommandLine,
        exit_code: i32,
        stdout: Option<Output>,
        stderr: Option<Output>,
        duration: Duration,
    ) -> Self {
        Self {
            command,
            exit_code,
            stdout,
            stderr,
            duration,
        }
    }

    /// The command that ran.
    pub fn command(&self) -> &CommandLine {
        &self.command
    }

    /// Exit code. Negative for a local child killed by a signal.
    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// Captured standard output, `None` if not captured.
    pub fn stdout(&self) -> Option<&Output> {
        self.stdout.as_ref()
    }

    /// Captured standard error, `None` if not captured.
    pub fn stderr(&self) -> Option<&Output> {
        self.stderr.as_ref()
    }

    /// Captured standard output as text.
    pub fn stdout_text(&self) -> Option<Cow<'_, str>> {
        self.stdout.as_ref().map(Output::to_text)
    }

    /// Captured standard error as text.
    pub fn stderr_text(&self) -> Option<Cow<'_, str>> {
        self.stderr.as_ref().map(Output::to_text)
    }

    /// Wall-clock execution time.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Check if command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Turn a failed result into an error.
    ///
    /// Recognized ZFS messages become [`RunnerError::Classified`]; any other
    /// non-zero exit becomes [`RunnerError::Failed`].
    pub fn check_returncode(self) -> Result<Self> {
        if self.success() {
            return Ok(self);
        }

        if let Some(err) = classify(self.exit_code, &self.stderr_text().unwrap_or_default()) {
            return Err(err.into());
        }

        Err(self.into_failure())
    }

    /// Decode standard output as tabular records.
    pub fn records(&self) -> Option<Vec<Record>> {
        decode(self.stdout_text().as_deref())
    }

    pub(crate) fn into_failure(self) -> RunnerError {
        RunnerError::Failed {
            command: self.command,
            exit_code: self.exit_code,
            stdout: self.stdout,
            stderr: self.stderr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ErrorKind;

    fn result(exit_code: i32, stdout: Option<&str>, stderr: &str) -> ExecutionResult {
        ExecutionResult::new(
            CommandLine::from(["zfs", "destroy", "tank/data"]),
            exit_code,
            stdout.map(|s| Output::Text(s.to_string())),
            Some(Output::Text(stderr.to_string())),
            Duration::from_millis(5),
        )
    }

    #[test]
    fn test_output_from_bytes() {
        assert_eq!(
            Output::from_bytes(b"abc".to_vec(), true),
            Output::Text("abc".into())
        );
        assert_eq!(
            Output::from_bytes(b"abc".to_vec(), false),
            Output::Bytes(b"abc".to_vec())
        );
    }

    #[test]
    fn test_output_lossy_utf8() {
        let out = Output::from_bytes(vec![b'o', b'k', 0xff], true);
        assert_eq!(out.to_text(), "ok\u{fffd}");
    }

    #[test]
    fn test_success() {
        assert!(result(0, Some(""), "").success());
        assert!(!result(1, Some(""), "").success());
    }

    #[test]
    fn test_check_returncode_ok() {
        let checked = result(0, Some("x"), "").check_returncode().unwrap();
        assert_eq!(checked.stdout_text().as_deref(), Some("x"));
    }

    #[test]
    fn test_check_returncode_classified() {
        let err = result(1, Some(""), "cannot destroy 'tank/data': dataset is busy\n")
            .check_returncode()
            .unwrap_err();
        let classified = err.classified().unwrap();
        assert_eq!(classified.kind, ErrorKind::Busy);
        assert_eq!(classified.object, "tank/data");
    }

    #[test]
    fn test_check_returncode_generic() {
        let err = result(1, Some("partial"), "something else broke")
            .check_returncode()
            .unwrap_err();
        match err {
            RunnerError::Failed {
                exit_code,
                stdout,
                stderr,
                ..
            } => {
                assert_eq!(exit_code, 1);
                assert_eq!(stdout, Some(Output::Text("partial".into())));
                assert_eq!(stderr, Some(Output::Text("something else broke".into())));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_check_returncode_other_exit_not_classified() {
        let err = result(2, None, "cannot destroy 'tank/data': dataset is busy")
            .check_returncode()
            .unwrap_err();
        assert_eq!(err.exit_code(), Some(2));
    }

    #[test]
    fn test_records() {
        let res = result(0, Some("tank\t1G\n"), "");
        assert_eq!(res.records(), Some(vec![vec!["tank".to_string(), "1G".to_string()]]));
        assert!(result(0, None, "").records().is_none());
    }
}
