//! Testing utilities and mock implementations.
//!
//! The mocks implement the orchestrator's seams ([`TrackerSite`],
//! [`MetadataResolver`], [`TorrentPackager`]) without any network access or
//! external tools. Mocks can share one [`CallLog`] so tests can assert on the
//! order of calls across trackers.
//!
//! # Example
//!
//! ```rust,ignore
//! use bookseed_core::testing::{CallLog, MockPackager, MockResolver, MockTrackerSite};
//!
//! let log = CallLog::new();
//! let site = MockTrackerSite::new("bibliotik")
//!     .with_book("9780131103627")
//!     .with_log(log.clone());
//!
//! // ... run the orchestrator ...
//!
//! assert_eq!(log.count(CallKind::Submit).await, 0);
//! ```
//!
//! [`TrackerSite`]: crate::tracker::TrackerSite
//! [`MetadataResolver`]: crate::metadata::MetadataResolver
//! [`TorrentPackager`]: crate::packager::TorrentPackager

mod call_log;
mod mock_packager;
mod mock_resolver;
mod mock_tracker;

pub use call_log::{CallKind, CallLog, RecordedCall};
pub use mock_packager::MockPackager;
pub use mock_resolver::MockResolver;
pub use mock_tracker::{MockFailure, MockTrackerSite};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::io::Write;
    use std::path::{Path, PathBuf};

    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    use crate::discovery::BookFile;
    use crate::identifier::Isbn;
    use crate::metadata::Metadata;

    /// Parse an ISBN literal.
    pub fn isbn(raw: &str) -> Isbn {
        Isbn::normalize(raw).unwrap_or_else(|| panic!("invalid test ISBN: {}", raw))
    }

    /// Metadata with reasonable defaults for `isbn`.
    pub fn metadata(isbn: &Isbn) -> Metadata {
        let mut metadata = Metadata::new(isbn.clone(), format!("Book {}: A Test Fixture", isbn));
        metadata.authors = vec!["Ada Lovelace".to_string()];
        metadata.publisher = Some("Fixture Press".to_string());
        metadata.year = Some(2001);
        metadata.pages = Some(320);
        metadata.description = Some("A book that only exists in tests.".to_string());
        metadata
    }

    /// Write a small book file named `name` under `dir`.
    pub fn write_book(dir: &Path, name: &str) -> BookFile {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .unwrap_or_else(|e| panic!("cannot create {}: {}", parent.display(), e));
        }
        std::fs::write(&path, format!("contents of {}", name))
            .unwrap_or_else(|e| panic!("cannot write {}: {}", path.display(), e));
        BookFile::new(path)
    }

    /// Write a zip container with the given `(entry, contents)` pairs.
    pub fn write_epub(dir: &Path, name: &str, entries: &[(&str, &str)]) -> PathBuf {
        let path = dir.join(name);
        let file = std::fs::File::create(&path)
            .unwrap_or_else(|e| panic!("cannot create {}: {}", path.display(), e));
        let mut zip = ZipWriter::new(file);
        for (entry, contents) in entries {
            zip.start_file(*entry, SimpleFileOptions::default())
                .unwrap_or_else(|e| panic!("cannot add {}: {}", entry, e));
            zip.write_all(contents.as_bytes())
                .unwrap_or_else(|e| panic!("cannot write {}: {}", entry, e));
        }
        zip.finish()
            .unwrap_or_else(|e| panic!("cannot finish {}: {}", path.display(), e));
        path
    }

    /// `META-INF/container.xml` pointing at `full_path`.
    pub fn container_xml(full_path: &str) -> String {
        format!(
            r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="{}" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#,
            full_path
        )
    }

    /// A minimal package document with one title and one creator.
    pub fn package_opf(title: &str, creator: &str) -> String {
        format!(
            r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>{}</dc:title>
    <dc:creator>{}</dc:creator>
  </metadata>
</package>"#,
            title, creator
        )
    }
}
