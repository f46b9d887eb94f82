//! # Engine Errors
//!
//! Every catalog, index and operator call returns [`Result<T>`]. The error carries
//! a short human-readable message plus a [`ErrorKind`] that callers branch on;
//! nothing in the crate or its callers inspects message text to decide behavior.
//!
//! Low-level file and mapping plumbing (`storage::ColumnFile`, metadata file I/O)
//! works in `eyre::Result` so it can attach path context with `wrap_err_with`.
//! When such a report crosses into the engine it becomes [`Error::Storage`] and
//! its context chain is kept in the rendered message:
//!
//! ```text
//! storage error: failed to extend 'disk/db1.t.a.col' to 8192 bytes: No space left on device
//! ```

use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("full: {0}")]
    Full(String),

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("storage error: {0:#}")]
    Storage(eyre::Report),

    #[error("index out of range: position {position} >= {len}")]
    IndexOutOfRange { position: usize, len: usize },

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("corrupt metadata: {0}")]
    CorruptMetadata(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("database is closed")]
    Closed,
}

/// Discriminant of [`Error`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidArgument,
    Full,
    ResourceExhausted,
    Storage,
    IndexOutOfRange,
    TypeMismatch,
    NotImplemented,
    CorruptMetadata,
    Parse,
    Closed,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::Full(_) => ErrorKind::Full,
            Error::ResourceExhausted(_) => ErrorKind::ResourceExhausted,
            Error::Storage(_) => ErrorKind::Storage,
            Error::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            Error::TypeMismatch(_) => ErrorKind::TypeMismatch,
            Error::NotImplemented(_) => ErrorKind::NotImplemented,
            Error::CorruptMetadata(_) => ErrorKind::CorruptMetadata,
            Error::Parse(_) => ErrorKind::Parse,
            Error::Closed => ErrorKind::Closed,
        }
    }
}

impl From<eyre::Report> for Error {
    fn from(report: eyre::Report) -> Self {
        Error::Storage(report)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Storage(eyre::Report::new(err))
    }
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::AlreadyExists => "AlreadyExists",
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::Full => "Full",
            ErrorKind::ResourceExhausted => "ResourceExhausted",
            ErrorKind::Storage => "StorageError",
            ErrorKind::IndexOutOfRange => "IndexOutOfRange",
            ErrorKind::TypeMismatch => "TypeMismatch",
            ErrorKind::NotImplemented => "NotImplemented",
            ErrorKind::CorruptMetadata => "CorruptMetadata",
            ErrorKind::Parse => "Parse",
            ErrorKind::Closed => "Closed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
