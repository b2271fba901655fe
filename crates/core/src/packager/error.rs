//! Error types for the packager module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while creating a torrent.
#[derive(Debug, Error)]
pub enum PackagerError {
    /// Torrent creation tool could not be located.
    #[error("torrent tool not found: {program}")]
    ToolNotFound { program: String },

    /// Input file not found.
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// Torrent creation tool exited unsuccessfully.
    #[error("torrent creation failed: {reason}")]
    Failed {
        reason: String,
        stderr: Option<String>,
    },

    /// I/O error while preparing or running the tool.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PackagerError {
    /// Creates a new failed error with stderr output.
    pub fn failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
            stderr,
        }
    }
}
