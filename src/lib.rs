//! # zfs-exec
//!
//! Process execution for ZFS tooling.
//!
//! Runs `zfs` and `zpool` style commands either as local child processes or
//! over a caller-supplied remote session, with one result and error model
//! for both:
//!
//! - **Timeouts**: a local child that overruns is killed and reaped, and the
//!   output it produced so far is kept
//! - **Classified failures**: `cannot <action> '<object>': <reason>` lines on
//!   standard error become [`ClassifiedError`] values with errno semantics
//! - **Tabular output**: [`CommandRunner::run_checked`] decodes `-H` style
//!   output into records of tab separated fields
//!
//! ## Quick Start
//!
//! ```no_run
//! use zfs_exec::{CommandRunner, ExecutionRequest};
//!
//! fn main() -> zfs_exec::Result<()> {
//!     zfs_exec::logging::try_init().ok();
//!
//!     let runner = CommandRunner::new();
//!     let pools = runner
//!         .run_checked(ExecutionRequest::new(["zpool", "list", "-H", "-o", "name,health"]))?
//!         .unwrap_or_default();
//!
//!     for pool in pools {
//!         println!("{} is {}", pool[0], pool[1]);
//!     }
//!     Ok(())
//! }
//! ```

pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod execution;
pub mod logging;
pub mod output;
pub mod session;

pub use classify::{classify, ClassifiedError, ErrorKind};
pub use error::{Result, RunnerError};
pub use execution::{
    CommandLine, CommandRunner, ExecutionRequest, ExecutionResult, Input, Output, RunnerOptions,
    StreamMode,
};
pub use output::{decode, Record};
pub use session::{RemoteChannel, RemoteSession};
