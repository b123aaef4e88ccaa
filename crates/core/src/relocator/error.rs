//! Error types for the relocator module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while moving or removing local files.
#[derive(Debug, Error)]
pub enum RelocatorError {
    /// Failed to list a directory.
    #[error("Failed to read directory: {path}")]
    ReadDirFailed {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Failed to create a directory.
    #[error("Failed to create directory: {path}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Failed to move a file or directory.
    #[error("Failed to move {from} to {to}")]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Failed to remove a file or directory.
    #[error("Failed to remove {path}")]
    RemoveFailed {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },
}

impl RelocatorError {
    /// Creates a MoveFailed error.
    pub fn move_failed(from: PathBuf, to: PathBuf, error: std::io::Error) -> Self {
        Self::MoveFailed { from, to, error }
    }

    /// Returns the path this error is about.
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::ReadDirFailed { path, .. } => path,
            Self::DirectoryCreationFailed { path, .. } => path,
            Self::MoveFailed { from, .. } => from,
            Self::RemoveFailed { path, .. } => path,
        }
    }
}
