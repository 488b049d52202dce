//! Error types for tree construction and lookup.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while building or querying a tree.
#[derive(Debug, Error)]
pub enum TreeError {
    /// No node matches the requested path.
    #[error("{}: no such file", path.display())]
    PathNotFound { path: PathBuf },

    /// Target is missing, a directory, or a symbolic link.
    #[error("{} is not a file or is a symlink", path.display())]
    NotAFile { path: PathBuf },

    /// Base path of a scan is not a directory.
    #[error("Root path is not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// OS-level failure, passed through untouched.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TreeError {
    /// Create a path-not-found error.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::PathNotFound { path: path.into() }
    }

    /// Create a not-a-file error.
    pub fn not_a_file(path: impl Into<PathBuf>) -> Self {
        Self::NotAFile { path: path.into() }
    }

    /// Check if this error is a lookup miss.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::PathNotFound { .. })
    }
}

/// Kind of build warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// Entry was not a regular file (symlink, device, vanished).
    NotAFile,
    /// Error reading a directory during the walk.
    ReadError,
}

/// Non-fatal anomaly recorded while building a tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildWarning {
    /// Path where the warning occurred.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl BuildWarning {
    /// Create a new build warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Create a warning for an entry skipped because it is not a regular file.
    pub fn not_a_file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            message: format!("Skipped, not a regular file: {}", path.display()),
            path,
            kind: WarningKind::NotAFile,
        }
    }

    /// Create a read error warning.
    pub fn read_error(path: impl Into<PathBuf>, error: impl std::fmt::Display) -> Self {
        Self {
            path: path.into(),
            message: format!("Read error: {error}"),
            kind: WarningKind::ReadError,
        }
    }
}

/// Result alias used across shatree.
pub type Result<T, E = TreeError> = std::result::Result<T, E>;
