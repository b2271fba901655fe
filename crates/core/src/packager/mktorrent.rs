//! `mktorrent`-based packager implementation.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

use super::error::PackagerError;
use super::{TorrentDescriptor, TorrentPackager};
use crate::config::PackagerConfig;

/// Runs `mktorrent -p -a <announce> -o <output> <file>`.
pub struct MktorrentPackager {
    config: PackagerConfig,
}

impl MktorrentPackager {
    /// Creates a new packager with the given configuration.
    pub fn new(config: PackagerConfig) -> Self {
        Self { config }
    }

    /// Creates a packager with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(PackagerConfig::default())
    }

    fn locate(&self) -> Result<PathBuf, PackagerError> {
        which::which(&self.config.program).map_err(|_| PackagerError::ToolNotFound {
            program: self.config.program.clone(),
        })
    }

    /// Builds the tool arguments.
    fn build_args(book: &Path, announce_url: &str, output: &Path) -> Vec<OsString> {
        vec![
            "-p".into(), // Private flag
            "-a".into(),
            announce_url.into(),
            "-o".into(),
            output.as_os_str().to_owned(),
            book.as_os_str().to_owned(),
        ]
    }
}

#[async_trait]
impl TorrentPackager for MktorrentPackager {
    fn name(&self) -> &str {
        "mktorrent"
    }

    async fn package(
        &self,
        book: &Path,
        announce_url: &str,
    ) -> Result<TorrentDescriptor, PackagerError> {
        if !tokio::fs::try_exists(book).await.unwrap_or(false) {
            return Err(PackagerError::InputNotFound {
                path: book.to_path_buf(),
            });
        }

        let program = self.locate()?;

        let workdir = tempfile::Builder::new().prefix("bookseed-").tempdir()?;
        let stem = book
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "book".to_string());
        let output = workdir.path().join(format!("{}.torrent", stem));

        debug!(
            program = %program.display(),
            book = %book.display(),
            output = %output.display(),
            "Creating torrent"
        );

        let result = Command::new(&program)
            .args(Self::build_args(book, announce_url, &output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
            warn!(
                book = %book.display(),
                status = %result.status,
                "Torrent creation failed"
            );
            return Err(PackagerError::failed(
                format!("{} exited with {}", self.config.program, result.status),
                (!stderr.is_empty()).then_some(stderr),
            ));
        }

        if !tokio::fs::try_exists(&output).await.unwrap_or(false) {
            return Err(PackagerError::failed(
                format!("{} produced no output file", self.config.program),
                None,
            ));
        }

        Ok(TorrentDescriptor::in_workdir(output, workdir))
    }

    async fn validate(&self) -> Result<(), PackagerError> {
        self.locate().map(|_| ())
    }
}
