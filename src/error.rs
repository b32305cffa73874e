//! # Error Handling
//!
//! This module defines the centralized error type for the clone engine. It
//! uses the `thiserror` library to describe every failure mode of a clone
//! with a readable message.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. Variants map onto the three failure classes
//!   a clone can report (`Clone`, `Patch`, `Rollback`) plus the lower-level
//!   filesystem and serialized-data errors they are built from.
//!
//! - **`ErrorKind`**: A payload-free classification of an `Error`, used when
//!   reporting which class of failure ended a clone.
//!
//! - **`FsErrorKind`**: Distinguishes the filesystem failures callers care
//!   about: "not found", "permission denied" and "already exists".
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.

use serde::Serialize;
use std::fmt;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Classification of a filesystem failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FsErrorKind {
    NotFound,
    PermissionDenied,
    AlreadyExists,
    Other,
}

impl From<io::ErrorKind> for FsErrorKind {
    fn from(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::NotFound => FsErrorKind::NotFound,
            io::ErrorKind::PermissionDenied => FsErrorKind::PermissionDenied,
            io::ErrorKind::AlreadyExists => FsErrorKind::AlreadyExists,
            _ => FsErrorKind::Other,
        }
    }
}

impl fmt::Display for FsErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FsErrorKind::NotFound => "not found",
            FsErrorKind::PermissionDenied => "permission denied",
            FsErrorKind::AlreadyExists => "already exists",
            FsErrorKind::Other => "failed",
        };
        f.write_str(text)
    }
}

/// Main error type for clone operations
#[derive(Error, Debug)]
pub enum Error {
    /// The source environment could not be copied, or the destination is
    /// already occupied.
    #[error("Clone error: {message}")]
    Clone { message: String },

    /// A patch target is missing, unreadable, unparseable, or could not be
    /// written back.
    #[error("Patch error in {file}: {message}")]
    Patch { file: String, message: String },

    /// The destination could not be removed after a failed clone. The
    /// partially cloned tree is still on disk and needs manual cleanup.
    #[error("Rollback error: could not remove {path}: {message}")]
    Rollback { path: String, message: String },

    /// A filesystem primitive failed.
    #[error("Filesystem operation error: {operation} {path}: {kind}: {message}")]
    Filesystem {
        operation: String,
        path: String,
        kind: FsErrorKind,
        message: String,
    },

    /// Serialized configuration data is corrupt or uses an unsupported token.
    #[error("Serialized data error at byte {offset}: {message}")]
    Serialized { offset: usize, message: String },
}

/// Payload-free classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Clone,
    Patch,
    Rollback,
    Filesystem,
    Serialized,
}

impl Error {
    /// Build a filesystem error from an I/O error raised while running
    /// `operation` on `path`.
    pub fn fs(operation: &str, path: &Path, err: io::Error) -> Self {
        Error::Filesystem {
            operation: operation.to_string(),
            path: path.display().to_string(),
            kind: err.kind().into(),
            message: err.to_string(),
        }
    }

    /// Wrap any error raised while patching `file` as a [`Error::Patch`].
    ///
    /// Patch errors pass through unchanged so the file name is not repeated.
    pub fn into_patch(self, file: &Path) -> Self {
        match self {
            Error::Patch { .. } => self,
            other => Error::Patch {
                file: file.display().to_string(),
                message: other.to_string(),
            },
        }
    }

    /// The class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Clone { .. } => ErrorKind::Clone,
            Error::Patch { .. } => ErrorKind::Patch,
            Error::Rollback { .. } => ErrorKind::Rollback,
            Error::Filesystem { .. } => ErrorKind::Filesystem,
            Error::Serialized { .. } => ErrorKind::Serialized,
        }
    }

    /// The filesystem failure class, if this error came from a filesystem
    /// primitive.
    pub fn fs_kind(&self) -> Option<FsErrorKind> {
        match self {
            Error::Filesystem { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
