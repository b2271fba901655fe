//! Mock tracker site for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::call_log::{CallKind, CallLog};
use crate::identifier::Isbn;
use crate::metadata::{Metadata, MetadataResolver};
use crate::packager::TorrentDescriptor;
use crate::tracker::{TrackerError, TrackerSite};

/// Failure a mock tracker call can be configured to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// The call landed on the login page.
    SessionExpired,
    /// The site answered with HTTP 500.
    Rejected,
    /// The connection dropped.
    Transport,
}

impl MockFailure {
    fn to_error(self, tracker: &str) -> TrackerError {
        match self {
            Self::SessionExpired => TrackerError::SessionExpired {
                tracker: tracker.to_string(),
            },
            Self::Rejected => TrackerError::Rejected {
                status: 500,
                message: "mock rejection".to_string(),
            },
            Self::Transport => TrackerError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "mock connection reset",
            )),
        }
    }
}

/// Mock implementation of the TrackerSite trait.
///
/// Provides controllable behavior for testing:
/// - Seed the ISBNs the tracker already has
/// - Fail searches or submissions
/// - Record every call in a [`CallLog`]
///
/// An accepted submission adds the ISBN to the tracker's books.
pub struct MockTrackerSite {
    name: String,
    announce_url: String,
    books: RwLock<HashSet<Isbn>>,
    search_failure: RwLock<Option<MockFailure>>,
    submit_failure: RwLock<Option<MockFailure>>,
    submissions: RwLock<Vec<Metadata>>,
    resolver: Option<Arc<dyn MetadataResolver>>,
    log: CallLog,
}

impl std::fmt::Debug for MockTrackerSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTrackerSite")
            .field("name", &self.name)
            .field("announce_url", &self.announce_url)
            .field("resolver", &self.resolver.as_ref().map(|r| r.name().to_string()))
            .finish()
    }
}

impl MockTrackerSite {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            announce_url: format!("https://{}.example/announce/mock-key", name),
            name,
            books: RwLock::new(HashSet::new()),
            search_failure: RwLock::new(None),
            submit_failure: RwLock::new(None),
            submissions: RwLock::new(Vec::new()),
            resolver: None,
            log: CallLog::new(),
        }
    }

    /// Record calls into a shared log.
    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    /// The tracker already has `isbn`.
    pub fn with_book(mut self, isbn: &str) -> Self {
        if let Some(isbn) = Isbn::normalize(isbn) {
            self.books.get_mut().insert(isbn);
        }
        self
    }

    /// Use a tracker-specific resolver instead of the default one.
    pub fn with_resolver(mut self, resolver: Arc<dyn MetadataResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn failing_search(mut self, failure: MockFailure) -> Self {
        *self.search_failure.get_mut() = Some(failure);
        self
    }

    pub fn failing_submit(mut self, failure: MockFailure) -> Self {
        *self.submit_failure.get_mut() = Some(failure);
        self
    }

    pub async fn set_search_failure(&self, failure: Option<MockFailure>) {
        *self.search_failure.write().await = failure;
    }

    pub async fn set_submit_failure(&self, failure: Option<MockFailure>) {
        *self.submit_failure.write().await = failure;
    }

    /// Metadata of every accepted submission.
    pub async fn submissions(&self) -> Vec<Metadata> {
        self.submissions.read().await.clone()
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }
}

#[async_trait]
impl TrackerSite for MockTrackerSite {
    fn name(&self) -> &str {
        &self.name
    }

    fn announce_url(&self) -> &str {
        &self.announce_url
    }

    fn metadata_resolver(&self) -> Option<Arc<dyn MetadataResolver>> {
        self.resolver.clone()
    }

    async fn has_book(&self, isbn: &Isbn) -> Result<bool, TrackerError> {
        self.log
            .record(&self.name, CallKind::HasBook, Some(isbn.to_string()), None)
            .await;

        if let Some(failure) = *self.search_failure.read().await {
            return Err(failure.to_error(&self.name));
        }

        Ok(self.books.read().await.contains(isbn))
    }

    async fn submit(
        &self,
        book: &Path,
        torrent: &TorrentDescriptor,
        metadata: &Metadata,
    ) -> Result<(), TrackerError> {
        self.log
            .record(
                &self.name,
                CallKind::Submit,
                Some(metadata.isbn.to_string()),
                Some(book.display().to_string()),
            )
            .await;

        if let Some(failure) = *self.submit_failure.read().await {
            return Err(failure.to_error(&self.name));
        }

        torrent.read().await?;
        self.books.write().await.insert(metadata.isbn.clone());
        self.submissions.write().await.push(metadata.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[tokio::test]
    async fn test_seeded_books_are_duplicates() {
        let site = MockTrackerSite::new("bibliotik").with_book("978-0-13-110362-7");
        assert!(site.has_book(&fixtures::isbn("9780131103627")).await.unwrap());
        assert!(!site.has_book(&fixtures::isbn("0262510871")).await.unwrap());
        assert_eq!(site.log().count(CallKind::HasBook).await, 2);
    }

    #[tokio::test]
    async fn test_search_failure() {
        let site = MockTrackerSite::new("bibliotik").failing_search(MockFailure::SessionExpired);
        let err = site
            .has_book(&fixtures::isbn("9780131103627"))
            .await
            .unwrap_err();
        assert!(err.is_session_expired());

        site.set_search_failure(None).await;
        assert!(!site.has_book(&fixtures::isbn("9780131103627")).await.unwrap());
    }

    #[tokio::test]
    async fn test_submit_records_and_adds_book() {
        let dir = tempfile::TempDir::new().unwrap();
        let torrent_path = dir.path().join("book.torrent");
        std::fs::write(&torrent_path, b"d4:infoe").unwrap();
        let torrent = TorrentDescriptor::new(&torrent_path);

        let site = MockTrackerSite::new("myanonamouse");
        let isbn = fixtures::isbn("0262510871");
        site.submit(Path::new("/books/sicp-0262510871.pdf"), &torrent, &fixtures::metadata(&isbn))
            .await
            .unwrap();

        assert_eq!(site.submissions().await.len(), 1);
        assert!(site.has_book(&isbn).await.unwrap());
    }

    #[tokio::test]
    async fn test_submit_rejection() {
        let dir = tempfile::TempDir::new().unwrap();
        let torrent_path = dir.path().join("book.torrent");
        std::fs::write(&torrent_path, b"d4:infoe").unwrap();

        let site = MockTrackerSite::new("bibliotik").failing_submit(MockFailure::Rejected);
        let isbn = fixtures::isbn("0262510871");
        let err = site
            .submit(
                Path::new("/books/sicp-0262510871.pdf"),
                &TorrentDescriptor::new(&torrent_path),
                &fixtures::metadata(&isbn),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, TrackerError::Rejected { status: 500, .. }));
        assert!(site.submissions().await.is_empty());
    }
}
