//! Book discovery: a recursive, symlink-following directory walk filtered by
//! extension.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::identifier::Isbn;

/// A local e-book file to be cross-posted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct BookFile {
    path: PathBuf,
}

impl BookFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// ISBN embedded in the file name, if any.
    pub fn isbn(&self) -> Option<Isbn> {
        Isbn::from_path(&self.path)
    }

    /// Lower-cased extension without the dot.
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
    }
}

/// Whether `path` has one of the given (lower-case) extensions.
pub fn has_book_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|ext| extensions.iter().any(|allowed| *allowed == ext))
}

/// Walk every root and collect regular files with a recognized extension.
///
/// Symlinks are followed; a link back to one of its own ancestors is logged
/// and skipped. Missing or unreadable directories are logged and skipped.
/// Files reached more than once, through another root spelling or a link,
/// are reported once under the first path seen. The result is sorted by path.
pub async fn discover_books(roots: &[PathBuf], extensions: &[String]) -> Vec<BookFile> {
    let roots = roots.to_vec();
    let extensions: Vec<String> = extensions.iter().map(|e| e.to_lowercase()).collect();

    match tokio::task::spawn_blocking(move || walk_roots(&roots, &extensions)).await {
        Ok(books) => {
            debug!(count = books.len(), "Discovered books");
            books
        }
        Err(e) => {
            warn!(error = %e, "Book discovery task failed");
            Vec::new()
        }
    }
}

fn walk_roots(roots: &[PathBuf], extensions: &[String]) -> Vec<BookFile> {
    let mut seen = HashSet::new();
    let mut books = Vec::new();

    for root in roots {
        let walker = WalkDir::new(root).follow_links(true).sort_by_file_name();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    if e.loop_ancestor().is_some() {
                        debug!(error = %e, "Skipping symlink loop");
                    } else {
                        warn!(root = %root.display(), error = %e, "Cannot read book directory");
                    }
                    continue;
                }
            };

            if !entry.file_type().is_file() || !has_book_extension(entry.path(), extensions) {
                continue;
            }

            let canonical = match std::fs::canonicalize(entry.path()) {
                Ok(canonical) => canonical,
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "Cannot resolve book path");
                    continue;
                }
            };
            if seen.insert(canonical) {
                books.push(BookFile::new(entry.into_path()));
            }
        }
    }

    books.sort();
    books
}
