//! Tracker site sessions.
//!
//! A [`TrackerSite`] is one authenticated relationship with a tracker. It
//! holds two session-scoped tokens harvested at login (the upload form's
//! authorization key and the announce URL for new torrents) and exposes the
//! duplicate check and the form submission. [`HttpTracker`] implements it for
//! every supported site, driven by that site's [`TrackerProfile`].
//!
//! Sessions are never refreshed. A call that comes back to the login page
//! fails with [`TrackerError::SessionExpired`].

mod html;
mod profile;
mod session;

pub use profile::{
    LoginForm, MetadataSource, TokenLocator, TrackerKind, TrackerProfile, UploadFields,
};
pub use session::HttpTracker;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::identifier::Isbn;
use crate::metadata::{Metadata, MetadataResolver};
use crate::packager::TorrentDescriptor;

/// Login and token harvesting failures. The tracker is unusable for the run.
#[derive(Debug, Error)]
pub enum AuthError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The site refused the credentials.
    #[error("{tracker} rejected the login: {reason}")]
    LoginRejected { tracker: String, reason: String },

    /// A session token was not found on the upload page.
    #[error("{token} not found on {tracker} upload page")]
    TokenNotFound { tracker: String, token: &'static str },

    /// A profile selector does not parse.
    #[error("invalid selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },
}

/// Failures of an authenticated call.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The site sent us back to its login page.
    #[error("{tracker} session expired")]
    SessionExpired { tracker: String },

    /// The site answered the upload with an error status.
    #[error("upload rejected with HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    /// Reading the torrent failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TrackerError {
    /// Whether the session can no longer be used.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired { .. })
    }
}

/// One authenticated tracker session.
#[async_trait]
pub trait TrackerSite: Send + Sync {
    /// Tracker name used in logs and reports.
    fn name(&self) -> &str;

    /// Announce URL new torrents for this tracker must carry.
    fn announce_url(&self) -> &str;

    /// Resolver this tracker requires, if it has its own.
    fn metadata_resolver(&self) -> Option<Arc<dyn MetadataResolver>>;

    /// Whether the tracker already has a book with this ISBN.
    ///
    /// Only a page carrying the site's "no results" marker counts as absent.
    async fn has_book(&self, isbn: &Isbn) -> Result<bool, TrackerError>;

    /// Submit the upload form.
    async fn submit(
        &self,
        book: &Path,
        torrent: &TorrentDescriptor,
        metadata: &Metadata,
    ) -> Result<(), TrackerError>;
}
