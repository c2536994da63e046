use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Error taxonomy shared by every [`crate::path::Path`] backend and the
/// operations built on top of it.
///
/// Backends return these directly; the [`crate::path::Path`] facade never
/// wraps them in a second error type.
#[derive(Debug, Error, Clone)]
pub enum TfmError {
    #[error("not found: {0}")]
    NotFound(PathBuf),

    #[error("already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// `rename`/`mkdir` etc. cannot cross scheme or authority boundaries;
    /// callers must fall back to copy+delete.
    #[error("cannot rename across storage: {from} -> {to}")]
    CrossStorage { from: PathBuf, to: PathBuf },

    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("network timeout after {0:?}")]
    NetworkTimeout(std::time::Duration),

    #[error("operation cancelled")]
    Cancelled,

    #[error("bad format: {0}")]
    BadFormat(String),

    #[error("{kind}: {message}")]
    Io {
        kind: io::ErrorKind,
        message: String,
    },
}

impl TfmError {
    pub fn io(err: io::Error) -> Self {
        TfmError::Io {
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    /// Short, stable label used in the status bar (`"[NotFound] message"`).
    pub fn kind_label(&self) -> &'static str {
        match self {
            TfmError::NotFound(_) => "NotFound",
            TfmError::AlreadyExists(_) => "AlreadyExists",
            TfmError::PermissionDenied(_) => "PermissionDenied",
            TfmError::CrossStorage { .. } => "CrossStorage",
            TfmError::Unsupported(_) => "Unsupported",
            TfmError::NetworkTimeout(_) => "NetworkTimeout",
            TfmError::Cancelled => "Cancelled",
            TfmError::BadFormat(_) => "BadFormat",
            TfmError::Io { .. } => "IO",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, TfmError::NotFound(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TfmError::Cancelled)
    }
}

impl From<io::Error> for TfmError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => TfmError::NotFound(PathBuf::new()),
            io::ErrorKind::AlreadyExists => TfmError::AlreadyExists(PathBuf::new()),
            io::ErrorKind::PermissionDenied => TfmError::PermissionDenied(PathBuf::new()),
            _ => TfmError::io(err),
        }
    }
}

/// Wraps [`TfmError`] with the path it occurred on, for error messages that
/// need the offending path but the originating call only had a bare
/// `io::Error`.
pub fn io_error_at(path: impl Into<PathBuf>, err: io::Error) -> TfmError {
    let path = path.into();
    match err.kind() {
        io::ErrorKind::NotFound => TfmError::NotFound(path),
        io::ErrorKind::AlreadyExists => TfmError::AlreadyExists(path),
        io::ErrorKind::PermissionDenied => TfmError::PermissionDenied(path),
        _ => TfmError::io(err),
    }
}

pub type Result<T> = std::result::Result<T, TfmError>;

/// User-facing rendering of an error for the status line: `"[Kind] message"`.
impl TfmError {
    pub fn status_line(&self) -> String {
        format!("[{}] {}", self.kind_label(), self)
    }
}
