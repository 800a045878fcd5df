//! Error taxonomy shared by the typed buffers and the stream stack.
//!
//! Every failure is an [`IoError`]. The host runtime maps each error onto one
//! of its exception classes through [`IoError::kind`], so the two conditions
//! that look alike from a distance (a stream that was closed versus a stream
//! that never had the capability) stay distinct all the way up.

use std::fmt;
use std::io;

use thiserror::Error;

pub type IoResult<T, E = IoError> = std::result::Result<T, E>;

/// Exception class an [`IoError`] surfaces as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    TypeError,
    ValueError,
    OverflowError,
    IndexError,
    UnsupportedOperation,
    BlockingIOError,
    EOFError,
    UnicodeError,
    LookupError,
    OSError,
}

/// Errors raised by typed buffers and streams.
#[derive(Debug, Error)]
pub enum IoError {
    /// Wrong argument type or mismatched element tag.
    #[error("{0}")]
    Type(String),

    /// Bad argument value (mode strings, sizes, newline values, absent elements).
    #[error("{0}")]
    Value(String),

    /// Numeric value outside the range of an element type.
    #[error("{0}")]
    Overflow(String),

    /// Index outside the sequence, or pop from an empty sequence.
    #[error("{0}")]
    Index(String),

    /// Operation attempted on a closed stream.
    #[error("I/O operation on closed file")]
    Closed,

    /// Operation attempted on a buffered layer whose raw stream was detached.
    #[error("raw stream has been detached")]
    Detached,

    /// Capability permanently absent from the stream.
    #[error("{0}")]
    Unsupported(String),

    /// The lower layer would block; `written` bytes were accepted before it did.
    #[error("write could not complete without blocking ({written} bytes written)")]
    Blocking { written: usize },

    /// Fewer bytes arrived than were required.
    #[error("{0}")]
    Eof(String),

    /// Encoding or decoding failed under the `strict` policy.
    #[error("'{encoding}' codec can't {action} {subject} in position {position}: {reason}")]
    Unicode {
        encoding: &'static str,
        action: &'static str,
        subject: String,
        position: usize,
        reason: &'static str,
    },

    /// Unknown encoding or error-handler name.
    #[error("{0}")]
    Lookup(String),

    /// Stream-level failure that is not tied to an errno.
    #[error("{0}")]
    Stream(String),

    #[error(transparent)]
    Os(#[from] OsError),
}

impl IoError {
    /// The exception class this error surfaces as.
    pub fn kind(&self) -> ErrorKind {
        match self {
            IoError::Type(_) => ErrorKind::TypeError,
            IoError::Value(_) | IoError::Closed | IoError::Detached => ErrorKind::ValueError,
            IoError::Overflow(_) => ErrorKind::OverflowError,
            IoError::Index(_) => ErrorKind::IndexError,
            IoError::Unsupported(_) => ErrorKind::UnsupportedOperation,
            IoError::Blocking { .. } => ErrorKind::BlockingIOError,
            IoError::Eof(_) => ErrorKind::EOFError,
            IoError::Unicode { .. } => ErrorKind::UnicodeError,
            IoError::Lookup(_) => ErrorKind::LookupError,
            IoError::Stream(_) | IoError::Os(_) => ErrorKind::OSError,
        }
    }

    #[inline]
    pub(crate) fn type_error(msg: impl Into<String>) -> Self {
        IoError::Type(msg.into())
    }

    #[inline]
    pub(crate) fn value(msg: impl Into<String>) -> Self {
        IoError::Value(msg.into())
    }

    #[inline]
    pub(crate) fn unsupported(msg: impl Into<String>) -> Self {
        IoError::Unsupported(msg.into())
    }

    #[inline]
    pub(crate) fn stream(msg: impl Into<String>) -> Self {
        IoError::Stream(msg.into())
    }

    /// Wrap a `std::io::Error` raised while operating on `path`.
    pub(crate) fn os(err: &io::Error, path: Option<&str>) -> Self {
        IoError::Os(OsError::from_io_error(err, path.unwrap_or("")))
    }
}

impl From<io::Error> for IoError {
    fn from(err: io::Error) -> Self {
        IoError::os(&err, None)
    }
}

// =============================================================================
// OsError
// =============================================================================

/// OS-level error with errno information.
#[derive(Debug, Clone)]
pub struct OsError {
    pub code: i32,
    pub message: String,
    pub path: Option<String>,
}

impl OsError {
    /// Create from raw error code and message.
    #[inline]
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
        }
    }

    /// Create with associated path.
    #[inline]
    pub fn with_path(code: i32, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: Some(path.into()),
        }
    }

    /// Create from `std::io::Error`, keeping the errno when the OS supplied one.
    pub fn from_io_error(e: &io::Error, path: &str) -> Self {
        let code = e.raw_os_error().unwrap_or(-1);
        let message = match e.raw_os_error() {
            Some(_) => strip_os_suffix(&e.to_string()),
            None => e.to_string(),
        };
        Self {
            code,
            message,
            path: if path.is_empty() {
                None
            } else {
                Some(path.to_string())
            },
        }
    }
}

/// `std` renders OS errors as "message (os error N)"; the errno is shown separately.
fn strip_os_suffix(rendered: &str) -> String {
    match rendered.rfind(" (os error ") {
        Some(idx) => rendered[..idx].to_string(),
        None => rendered.to_string(),
    }
}

impl fmt::Display for OsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref path) = self.path {
            write!(f, "[Errno {}] {}: '{}'", self.code, self.message, path)
        } else {
            write!(f, "[Errno {}] {}", self.code, self.message)
        }
    }
}

impl std::error::Error for OsError {}
