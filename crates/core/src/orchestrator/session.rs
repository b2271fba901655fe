//! Tracker sessions as seen by the orchestrator.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{error, info, warn};

use super::types::{UploadError, UploadReceipt};
use crate::config::Config;
use crate::http::HttpOptions;
use crate::identifier::Isbn;
use crate::metadata::MetadataResolver;
use crate::packager::TorrentPackager;
use crate::tracker::{HttpTracker, TrackerError, TrackerSite};

/// A tracker site bound to the resolver and packager its uploads use.
///
/// The resolver is the site's own when it has one, otherwise the shared
/// default. Once disabled, a session stays disabled for the rest of the run.
pub struct TrackerSession {
    site: Arc<dyn TrackerSite>,
    resolver: Arc<dyn MetadataResolver>,
    packager: Arc<dyn TorrentPackager>,
    disabled: AtomicBool,
}

impl std::fmt::Debug for TrackerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackerSession")
            .field("tracker", &self.site.name())
            .field("resolver", &self.resolver.name())
            .field("packager", &self.packager.name())
            .field("disabled", &self.is_disabled())
            .finish()
    }
}

impl TrackerSession {
    pub fn new(
        site: Arc<dyn TrackerSite>,
        default_resolver: Arc<dyn MetadataResolver>,
        packager: Arc<dyn TorrentPackager>,
    ) -> Self {
        let resolver = site.metadata_resolver().unwrap_or(default_resolver);
        Self {
            site,
            resolver,
            packager,
            disabled: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        self.site.name()
    }

    /// Name of the resolver uploads to this tracker use.
    pub fn resolver_name(&self) -> &str {
        self.resolver.name()
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Acquire)
    }

    /// Stop using this tracker for the rest of the run.
    pub fn disable(&self) {
        if !self.disabled.swap(true, Ordering::AcqRel) {
            warn!(tracker = %self.name(), "Session expired, tracker disabled for the rest of the run");
        }
    }

    pub async fn has_book(&self, isbn: &Isbn) -> Result<bool, TrackerError> {
        self.site.has_book(isbn).await
    }

    /// Resolve metadata, package and submit.
    ///
    /// `Ok(None)` when the resolver has nothing for the ISBN; nothing is
    /// packaged or sent in that case.
    pub async fn upload(
        &self,
        book: &Path,
        isbn: &Isbn,
    ) -> Result<Option<UploadReceipt>, UploadError> {
        let Some(metadata) = self.resolver.resolve(isbn).await? else {
            return Ok(None);
        };

        let torrent = self.packager.package(book, self.site.announce_url()).await?;
        self.site.submit(book, &torrent, &metadata).await?;

        Ok(Some(UploadReceipt { torrent, metadata }))
    }
}

/// Authenticate every enabled tracker, in configured order.
///
/// A tracker that fails to authenticate is logged and left out.
pub async fn open_sessions(
    config: &Config,
    options: &HttpOptions,
    default_resolver: Arc<dyn MetadataResolver>,
    packager: Arc<dyn TorrentPackager>,
) -> Vec<TrackerSession> {
    let mut sessions = Vec::new();

    for (kind, credentials) in config.enabled_trackers() {
        let mut profile = kind.profile();
        if let Some(url) = &credentials.url {
            profile = profile.with_base_url(url.as_str());
        }

        match HttpTracker::authenticate(
            profile,
            &credentials.username,
            &credentials.password,
            options,
        )
        .await
        {
            Ok(tracker) => {
                let session =
                    TrackerSession::new(Arc::new(tracker), default_resolver.clone(), packager.clone());
                info!(
                    tracker = %session.name(),
                    resolver = %session.resolver_name(),
                    "Tracker ready"
                );
                sessions.push(session);
            }
            Err(e) => {
                error!(tracker = %kind, error = %e, "Authentication failed, tracker excluded");
            }
        }
    }

    sessions
}
