//! Archival of accepted uploads.
//!
//! After a tracker accepts a book, its torrent is copied into the torrent
//! archive and the book file is moved into the data archive. The torrent goes
//! first; if moving the book then fails the copied torrent is removed again,
//! so a book is either fully archived or left where it was.
//!
//! Renamed EPUBs fall back on their embedded metadata for an author or year
//! the resolver did not provide.

mod error;

pub use error::ArchiveError;

use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::config::GlobalConfig;
use crate::epub::read_epub_metadata_async;
use crate::metadata::Metadata;
use crate::packager::TorrentDescriptor;

const UNKNOWN: &str = "UNKNOWN";

/// Where an archived book and its torrent ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchivedBook {
    pub book: PathBuf,
    pub torrent: PathBuf,
}

/// Moves uploaded books and their torrents into the configured archives.
#[derive(Debug, Clone)]
pub struct BookArchiver {
    data_dir: PathBuf,
    torrent_dir: PathBuf,
    rename: bool,
}

impl BookArchiver {
    pub fn new(data_dir: impl Into<PathBuf>, torrent_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            torrent_dir: torrent_dir.into(),
            rename: false,
        }
    }

    pub fn from_config(global: &GlobalConfig) -> Self {
        Self::new(&global.data_dir, &global.torrent_dir).with_renaming(global.rename_archived)
    }

    /// Name archived files after their metadata instead of keeping the
    /// original file name.
    pub fn with_renaming(mut self, rename: bool) -> Self {
        self.rename = rename;
        self
    }

    /// Archive `book` and `torrent`.
    pub async fn archive(
        &self,
        book: &Path,
        torrent: &TorrentDescriptor,
        metadata: &Metadata,
    ) -> Result<ArchivedBook, ArchiveError> {
        create_dir(&self.data_dir).await?;
        create_dir(&self.torrent_dir).await?;

        let book_name = if self.rename {
            let extension = book
                .extension()
                .map(|e| e.to_string_lossy().to_string())
                .unwrap_or_default();
            archive_name(&naming_metadata(book, metadata).await, &extension)
        } else {
            book.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| archive_name(metadata, ""))
        };

        let book_dest = self.data_dir.join(&book_name);
        let torrent_dest = self
            .torrent_dir
            .join(Path::new(&book_name).with_extension("torrent"));

        ensure_absent(&book_dest).await?;
        ensure_absent(&torrent_dest).await?;

        fs::copy(torrent.path(), &torrent_dest).await.map_err(|e| {
            ArchiveError::copy_failed(torrent.path().to_path_buf(), torrent_dest.clone(), e)
        })?;

        if let Err(e) = move_file(book, &book_dest).await {
            if let Err(cleanup) = fs::remove_file(&torrent_dest).await {
                warn!(
                    path = %torrent_dest.display(),
                    error = %cleanup,
                    "Failed to remove archived torrent after book move failed"
                );
            }
            return Err(e);
        }

        debug!(
            book = %book_dest.display(),
            torrent = %torrent_dest.display(),
            "Archived upload"
        );

        Ok(ArchivedBook {
            book: book_dest,
            torrent: torrent_dest,
        })
    }
}

/// Resolved metadata, with missing authors or year taken from the book's
/// embedded EPUB metadata when there is any.
async fn naming_metadata(book: &Path, metadata: &Metadata) -> Metadata {
    let mut naming = metadata.clone();
    let complete = !naming.authors.is_empty() && naming.year.is_some();
    let is_epub = book
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("epub"));
    if complete || !is_epub {
        return naming;
    }

    match read_epub_metadata_async(book).await {
        Ok(embedded) => embedded.fill_missing(&mut naming),
        Err(e) => debug!(book = %book.display(), error = %e, "No embedded metadata for naming"),
    }
    naming
}

async fn create_dir(path: &Path) -> Result<(), ArchiveError> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| ArchiveError::DirectoryCreationFailed {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Archived files are never replaced, and an unanswerable existence check
/// counts as a failure.
async fn ensure_absent(path: &Path) -> Result<(), ArchiveError> {
    match fs::try_exists(path).await {
        Ok(false) => Ok(()),
        Ok(true) => Err(ArchiveError::DestinationExists {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(ArchiveError::DestinationCheckFailed {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Rename, falling back to copy + delete across filesystems.
async fn move_file(source: &Path, destination: &Path) -> Result<(), ArchiveError> {
    match fs::rename(source, destination).await {
        Ok(()) => return Ok(()),
        // Cross-filesystem moves fail with EXDEV (18 on Linux)
        Err(e) if e.kind() == std::io::ErrorKind::CrossesDevices || e.raw_os_error() == Some(18) => {}
        Err(e) => {
            return Err(ArchiveError::move_failed(
                source.to_path_buf(),
                destination.to_path_buf(),
                e,
            ))
        }
    }

    fs::copy(source, destination).await.map_err(|e| {
        ArchiveError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e)
    })?;

    if let Err(e) = fs::remove_file(source).await {
        let _ = fs::remove_file(destination).await;
        return Err(ArchiveError::move_failed(
            source.to_path_buf(),
            destination.to_path_buf(),
            e,
        ));
    }

    Ok(())
}

/// `<first author surname> (<year>) <short title> (isbn<isbn>).<ext>`
///
/// "Surname, Given" authors use the part before the comma, others their last
/// word. The short title stops at the first colon. Missing parts read
/// `UNKNOWN`.
pub fn archive_name(metadata: &Metadata, extension: &str) -> String {
    let surname = metadata
        .authors
        .first()
        .and_then(|author| match author.split_once(',') {
            Some((surname, _)) => Some(surname.trim()),
            None => author.split_whitespace().last(),
        })
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN);

    let year = metadata
        .year
        .map(|y| y.to_string())
        .unwrap_or_else(|| UNKNOWN.to_string());

    let short_title = metadata
        .title
        .split(':')
        .next()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(UNKNOWN);

    let name = format!(
        "{} ({}) {} (isbn{})",
        surname, year, short_title, metadata.isbn
    );
    let name: String = name
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '-' } else { c })
        .collect();

    if extension.is_empty() {
        name
    } else {
        format!("{}.{}", name, extension)
    }
}
