//! Error types shared by the registry, version and rendering layers
//!
//! Every failure falls into one of four kinds (format, I/O, fetch, not-found)
//! plus cancellation. Variants carry the offending artifact as structured
//! fields so callers can match on them instead of parsing messages.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// All errors produced by blueprint-core
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input: a semver string, registry JSON, or template syntax
    #[error("invalid {subject}: {message}")]
    Format { subject: String, message: String },

    /// A file or directory could not be read, written or created
    #[error("I/O error at {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// HTTP transport failure or a non-2xx response
    #[error("fetch {url} failed{}: {message}", .status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
    Fetch {
        url: String,
        status: Option<u16>,
        message: String,
    },

    /// No blueprint with the requested name exists in the catalog
    #[error("blueprint not found: {name}")]
    NotFound { name: String },

    /// The operation was cancelled before it completed
    #[error("operation cancelled")]
    Cancelled,
}

/// Coarse error classification for programmatic matching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Format,
    Io,
    Fetch,
    NotFound,
    Cancelled,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Format { .. } => ErrorKind::Format,
            Error::Io { .. } => ErrorKind::Io,
            Error::Fetch { .. } => ErrorKind::Fetch,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub(crate) fn format(subject: impl Into<String>, message: impl ToString) -> Self {
        Error::Format {
            subject: subject.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub(crate) fn fetch(url: impl Into<String>, status: Option<u16>, message: impl ToString) -> Self {
        Error::Fetch {
            url: url.into(),
            status,
            message: message.to_string(),
        }
    }
}

/// A rendering run that stopped part-way through
///
/// Files listed in `written` were fully written before the failure and remain
/// on disk; the caller decides whether to clean them up.
#[derive(Error, Debug)]
#[error("rendering {} failed after {} file(s) were written", .file.display(), .written.len())]
pub struct RenderFailure {
    /// Source-relative path of the file being processed when the error occurred
    pub file: PathBuf,
    /// Destination paths written before the failure, in render order
    pub written: Vec<PathBuf>,
    #[source]
    pub source: Error,
}

impl RenderFailure {
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}
