//! Command execution.
//!
//! A [`CommandRunner`] takes an [`ExecutionRequest`] and runs it either as a
//! local child process or, when the request carries a session, over a
//! [`RemoteSession`](crate::session::RemoteSession). Both backends return the
//! same [`ExecutionResult`] and raise the same errors.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use zfs_exec::execution::{CommandRunner, ExecutionRequest, StreamMode};
//!
//! let runner = CommandRunner::new();
//! let result = runner
//!     .run(
//!         ExecutionRequest::new(["zpool", "status"])
//!             .stdout(StreamMode::Capture)
//!             .text(true)
//!             .timeout(Duration::from_secs(30)),
//!     )
//!     .unwrap();
//! println!("{}", result.stdout_text().unwrap_or_default());
//! ```

mod command;
mod local;
mod remote;
mod result;
mod runner;
mod stream;

pub use command::{CommandLine, ExecutionRequest, Input, StreamMode};
pub use result::{ExecutionResult, Output};
pub use runner::{
    CommandRunner, RunnerOptions, DEFAULT_DRAIN_TIMEOUT, DEFAULT_POLL_INTERVAL, INPUT_CHUNK_SIZE,
};
