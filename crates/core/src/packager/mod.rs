//! Torrent packaging.
//!
//! A [`TorrentPackager`] turns one book file into a private, single-file
//! torrent announcing to a tracker's session-scoped announce URL. The produced
//! [`TorrentDescriptor`] lives in a fresh temporary directory that is removed
//! when the descriptor is dropped; archiving copies it out first.

mod error;
mod mktorrent;

pub use error::PackagerError;
pub use mktorrent::MktorrentPackager;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A generated `.torrent` file for one upload attempt.
#[derive(Debug)]
pub struct TorrentDescriptor {
    path: PathBuf,
    /// Keeps the temporary working directory alive until the descriptor drops.
    _workdir: Option<TempDir>,
}

impl TorrentDescriptor {
    /// Wrap an existing torrent file. The file is not removed on drop.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _workdir: None,
        }
    }

    /// Wrap a torrent file living inside a temporary directory owned by the
    /// descriptor.
    pub fn in_workdir(path: impl Into<PathBuf>, workdir: TempDir) -> Self {
        Self {
            path: path.into(),
            _workdir: Some(workdir),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name of the torrent, used as the multipart file name.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload.torrent".to_string())
    }

    /// Read the torrent bytes.
    pub async fn read(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }
}

/// Creates torrent descriptors for book files.
#[async_trait]
pub trait TorrentPackager: Send + Sync {
    /// Returns the name of this packager implementation.
    fn name(&self) -> &str;

    /// Package `book` as a private torrent announcing to `announce_url`.
    async fn package(
        &self,
        book: &Path,
        announce_url: &str,
    ) -> Result<TorrentDescriptor, PackagerError>;

    /// Validates that the packager is properly configured and ready.
    async fn validate(&self) -> Result<(), PackagerError>;
}
