//! Decoding of `zfs`/`zpool` machine-readable output.
//!
//! With `-H` (scripted mode) the tools print one object per line and separate
//! columns with a single tab. This module turns that text into [`Record`]s.
//!
//! # Example
//!
//! ```
//! use zfs_exec::output::decode;
//!
//! let records = decode(Some("tank\t1.2T\ntank/home\t300G\n")).unwrap();
//! assert_eq!(records[1], vec!["tank/home", "300G"]);
//!
//! // No captured output is different from empty output.
//! assert!(decode(None).is_none());
//! assert_eq!(decode(Some("")), Some(vec![]));
//! ```

mod decoder;

pub use decoder::{decode, encode, Record};
