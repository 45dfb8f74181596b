//! Remote sessions.
//!
//! Remote execution goes through a caller-supplied [`RemoteSession`].

mod remote;

pub use remote::{RemoteChannel, RemoteSession};
