//! Mock torrent packager for testing.

use async_trait::async_trait;
use std::path::Path;

use super::call_log::{CallKind, CallLog};
use crate::identifier::Isbn;
use crate::packager::{PackagerError, TorrentDescriptor, TorrentPackager};

/// Mock implementation of the TorrentPackager trait.
///
/// Writes a small placeholder `.torrent` into a fresh temporary directory,
/// like the real packager, without running any external tool.
#[derive(Debug, Default)]
pub struct MockPackager {
    failing: bool,
    log: CallLog,
}

impl MockPackager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Packager whose every run fails.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }
}

#[async_trait]
impl TorrentPackager for MockPackager {
    fn name(&self) -> &str {
        "mock-packager"
    }

    async fn package(
        &self,
        book: &Path,
        announce_url: &str,
    ) -> Result<TorrentDescriptor, PackagerError> {
        self.log
            .record(
                self.name(),
                CallKind::Package,
                Isbn::from_path(book).map(|i| i.to_string()),
                Some(announce_url.to_string()),
            )
            .await;

        if self.failing {
            return Err(PackagerError::failed("mock packager failure", None));
        }

        let workdir = tempfile::Builder::new()
            .prefix("bookseed-mock-")
            .tempdir()?;
        let stem = book
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "book".to_string());
        let path = workdir.path().join(format!("{}.torrent", stem));

        let contents = format!(
            "d8:announce{}:{}4:infod4:name{}:{}7:privatei1eee",
            announce_url.len(),
            announce_url,
            stem.len(),
            stem
        );
        tokio::fs::write(&path, contents).await?;

        Ok(TorrentDescriptor::in_workdir(path, workdir))
    }

    async fn validate(&self) -> Result<(), PackagerError> {
        if self.failing {
            return Err(PackagerError::ToolNotFound {
                program: "mock-packager".to_string(),
            });
        }
        Ok(())
    }
}
