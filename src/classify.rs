//! Classification of ZFS error messages.
//!
//! `zfs` and `zpool` report every failure through a line on stderr and exit
//! code 1. The messages that callers need to react to have the shape
//!
//! ```text
//! cannot <action> <object>: <reason>
//! ```
//!
//! where `<object>` may be wrapped in single quotes. [`classify`] turns the
//! known reasons into a [`ClassifiedError`].

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// `cannot <action> <object>: <reason>`, action matched lazily.
static ERROR_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^cannot ([^ \n]+(?: [^ \n]+)*?) ([^ \n]+): (.+?)\r?$").unwrap()
});

/// Kind of a recognized ZFS failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The dataset does not exist.
    NotFound,
    /// The dataset already exists.
    AlreadyExists,
    /// The dataset is busy.
    Busy,
    /// The hold tag is not present on the dataset.
    TagNotFound,
    /// The hold tag is already present on the dataset.
    TagAlreadyExists,
}

impl ErrorKind {
    /// Every kind, in matching order.
    pub const ALL: [ErrorKind; 5] = [
        ErrorKind::NotFound,
        ErrorKind::AlreadyExists,
        ErrorKind::Busy,
        ErrorKind::TagNotFound,
        ErrorKind::TagAlreadyExists,
    ];

    /// The reason text as printed by zfs.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NotFound => "dataset does not exist",
            Self::AlreadyExists => "dataset already exists",
            Self::Busy => "dataset is busy",
            Self::TagNotFound => "no such tag on this dataset",
            Self::TagAlreadyExists => "tag already exists on this dataset",
        }
    }

    /// The errno value equivalent to this kind.
    pub fn errno(&self) -> i32 {
        match self {
            Self::NotFound | Self::TagNotFound => libc::ENOENT,
            Self::AlreadyExists | Self::TagAlreadyExists => libc::EEXIST,
            Self::Busy => libc::EBUSY,
        }
    }

    /// Symbolic name of the errno value.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound | Self::TagNotFound => "ENOENT",
            Self::AlreadyExists | Self::TagAlreadyExists => "EEXIST",
            Self::Busy => "EBUSY",
        }
    }

    /// Look up the kind for an exact reason string.
    pub fn from_reason(reason: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.reason() == reason)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// A recognized ZFS failure on a named object.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("[Errno {}] {}: '{object}'", .kind.errno(), .kind.reason())]
pub struct ClassifiedError {
    /// What went wrong.
    pub kind: ErrorKind,
    /// Dataset, snapshot or bookmark name, quotes removed.
    pub object: String,
}

impl ClassifiedError {
    /// Create a classified error for `object`.
    pub fn new(kind: ErrorKind, object: impl Into<String>) -> Self {
        Self {
            kind,
            object: object.into(),
        }
    }

    /// The errno value of the kind.
    pub fn errno(&self) -> i32 {
        self.kind.errno()
    }

    /// The reason text of the kind.
    pub fn reason(&self) -> &'static str {
        self.kind.reason()
    }
}

/// Classify a failed command from its exit code and stderr.
///
/// Only exit code 1 carries recognizable messages; anything else returns
/// `None`. Each stderr line is tried in order and the first one with a known
/// reason wins. Unrecognized text also returns `None`.
pub fn classify(exit_code: i32, stderr: &str) -> Option<ClassifiedError> {
    if exit_code != 1 {
        return None;
    }

    ERROR_LINE.captures_iter(stderr).find_map(|caps| {
        let kind = ErrorKind::from_reason(caps.get(3)?.as_str())?;
        let object = unquote(caps.get(2)?.as_str());
        Some(ClassifiedError::new(kind, object))
    })
}

fn unquote(object: &str) -> &str {
    object
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(object)
}
