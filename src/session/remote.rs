//! Remote session capability.
//!
//! A session is an already connected, already authenticated transport (an
//! SSH client, for example) owned by the caller. This crate only opens
//! command-scoped channels on it and never manages the connection itself.
//!
//! Remote output is always captured: a request with a session may not route
//! `stdout` or `stderr` anywhere but [`StreamMode::Capture`], and its `text`
//! setting picks between [`Output::Text`] and [`Output::Bytes`].
//!
//! [`StreamMode::Capture`]: crate::execution::StreamMode::Capture
//! [`Output::Text`]: crate::execution::Output::Text
//! [`Output::Bytes`]: crate::execution::Output::Bytes

use std::io::{self, Read, Write};
use std::time::Duration;

/// An established connection that can execute command strings.
///
/// Implementations decide whether concurrent calls on one session are safe.
/// Socket-level timeouts must surface as [`io::ErrorKind::TimedOut`] or
/// [`io::ErrorKind::WouldBlock`] from any channel method; every other error
/// is treated as a transport failure.
pub trait RemoteSession: Send + Sync {
    /// Start `command` and return its channel.
    ///
    /// `timeout` applies to every blocking operation on the channel.
    fn exec_command(
        &self,
        command: &str,
        timeout: Option<Duration>,
    ) -> io::Result<Box<dyn RemoteChannel + '_>>;
}

/// The three streams and exit status of one remote command.
pub trait RemoteChannel {
    /// The remote command's standard input.
    fn stdin(&mut self) -> &mut dyn Write;

    /// Signal end of input to the remote command.
    fn close_stdin(&mut self) -> io::Result<()>;

    /// Block until the remote command exits and return its status.
    fn recv_exit_status(&mut self) -> io::Result<i32>;

    /// The remote command's standard output.
    fn stdout(&mut self) -> &mut dyn Read;

    /// The remote command's standard error.
    fn stderr(&mut self) -> &mut dyn Read;
}
