//! Error types for the epub module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading EPUB metadata.
#[derive(Debug, Error)]
pub enum EpubError {
    #[error("Failed to open {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not a readable zip container.
    #[error("Not an EPUB container: {path}")]
    Container {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Failed to read {entry} from {path}")]
    Entry {
        path: PathBuf,
        entry: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed XML in {entry}: {message}")]
    Xml { entry: String, message: String },

    /// No package document in any of the usual places.
    #[error("No package document found in {path}")]
    PackageNotFound { path: PathBuf },

    /// The package document has no `<metadata>` element.
    #[error("No metadata in {entry}")]
    MetadataNotFound { entry: String },
}
