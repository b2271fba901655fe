//! Upload pipeline integration tests.
//!
//! These tests drive books through the orchestrator with mock trackers and
//! verify the per-book lifecycle:
//! identify -> duplicate check -> resolve -> package -> submit -> archive

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use bookseed_core::{
    discover_books,
    testing::{fixtures, CallKind, CallLog, MockFailure, MockPackager, MockResolver, MockTrackerSite},
    AttemptResult, BookArchiver, BookFile, BookOutcome, MetadataResolver, OrchestratorConfig,
    TrackerSession, TrackerSite, UploadOrchestrator,
};

const KR: &str = "kernighan-ritchie-9780131103627.epub";
const SICP: &str = "sicp 0262510871.pdf";

/// Test helper owning the directories and the shared call log.
struct TestHarness {
    log: CallLog,
    default_resolver: Arc<MockResolver>,
    inbox: PathBuf,
    data_dir: PathBuf,
    torrent_dir: PathBuf,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let log = CallLog::new();
        Self {
            default_resolver: Arc::new(MockResolver::new("openlibrary").with_log(log.clone())),
            log,
            inbox: temp_dir.path().join("inbox"),
            data_dir: temp_dir.path().join("uploaded"),
            torrent_dir: temp_dir.path().join("torrents"),
            _temp_dir: temp_dir,
        }
    }

    fn site(&self, name: &str) -> MockTrackerSite {
        MockTrackerSite::new(name).with_log(self.log.clone())
    }

    fn book(&self, name: &str) -> BookFile {
        fixtures::write_book(&self.inbox, name)
    }

    fn packager(&self) -> Arc<MockPackager> {
        Arc::new(MockPackager::new().with_log(self.log.clone()))
    }

    /// A session for `site` with its own packager. The site's resolver, if
    /// any, takes precedence over the default one.
    fn session(&self, site: &Arc<MockTrackerSite>, packager: Arc<MockPackager>) -> TrackerSession {
        TrackerSession::new(
            site.clone() as Arc<dyn TrackerSite>,
            self.default_resolver.clone() as Arc<dyn MetadataResolver>,
            packager,
        )
    }

    /// Orchestrator whose sites share one packager.
    fn orchestrator(
        &self,
        sites: &[Arc<MockTrackerSite>],
        config: OrchestratorConfig,
        rename: bool,
    ) -> UploadOrchestrator {
        let packager = self.packager();
        let sessions = sites
            .iter()
            .map(|site| self.session(site, packager.clone()))
            .collect();
        self.orchestrator_with(sessions, config, rename)
    }

    fn orchestrator_with(
        &self,
        sessions: Vec<TrackerSession>,
        config: OrchestratorConfig,
        rename: bool,
    ) -> UploadOrchestrator {
        let archiver =
            BookArchiver::new(&self.data_dir, &self.torrent_dir).with_renaming(rename);
        UploadOrchestrator::new(sessions, archiver, config)
    }

    /// Calls of `kind` made to `target` for `isbn`.
    async fn count(&self, target: &str, kind: CallKind, isbn: &str) -> usize {
        self.log
            .calls_to(target)
            .await
            .iter()
            .filter(|c| c.kind == kind && c.isbn.as_deref() == Some(isbn))
            .count()
    }
}

fn results(report: &bookseed_core::BookReport) -> Vec<(String, AttemptResult)> {
    report
        .attempts
        .iter()
        .map(|a| (a.tracker.clone(), a.result.clone()))
        .collect()
}

#[tokio::test]
async fn test_duplicate_on_first_tracker_uploads_to_second() {
    let harness = TestHarness::new();
    let a = Arc::new(harness.site("alpha").with_book("9780131103627"));
    let b = Arc::new(harness.site("beta"));
    let orchestrator = harness.orchestrator(&[a.clone(), b.clone()], OrchestratorConfig::default(), false);

    let book = harness.book(KR);
    let report = orchestrator.process_book(&book).await;

    assert!(matches!(
        &report.outcome,
        BookOutcome::Uploaded { tracker, .. } if tracker == "beta"
    ));
    assert_eq!(
        results(&report),
        vec![
            ("alpha".to_string(), AttemptResult::Duplicate),
            ("beta".to_string(), AttemptResult::Uploaded),
        ]
    );

    // alpha is searched but never receives an upload
    assert_eq!(harness.count("alpha", CallKind::HasBook, "9780131103627").await, 1);
    assert_eq!(harness.count("alpha", CallKind::Submit, "9780131103627").await, 0);
    assert_eq!(b.submissions().await.len(), 1);

    // packaged with beta's announce URL
    let packaged = harness.log.calls_to("mock-packager").await;
    assert_eq!(packaged.len(), 1);
    assert_eq!(packaged[0].detail.as_deref(), Some(b.announce_url()));
}

#[tokio::test]
async fn test_first_acceptance_archives_and_stops() {
    let harness = TestHarness::new();
    let a = Arc::new(harness.site("alpha"));
    let b = Arc::new(harness.site("beta"));
    let orchestrator = harness.orchestrator(&[a.clone(), b.clone()], OrchestratorConfig::default(), false);

    let book = harness.book(KR);
    let report = orchestrator.process_book(&book).await;

    match &report.outcome {
        BookOutcome::Uploaded {
            tracker,
            book: archived_book,
            torrent,
            ..
        } => {
            assert_eq!(tracker, "alpha");
            assert_eq!(archived_book, &harness.data_dir.join(KR));
            assert_eq!(
                torrent,
                &harness.torrent_dir.join("kernighan-ritchie-9780131103627.torrent")
            );
            assert!(archived_book.exists());
            assert!(torrent.exists());
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    assert!(!book.path().exists());
    assert!(harness.log.calls_to("beta").await.is_empty());
    assert_eq!(a.submissions().await.len(), 1);
}

#[tokio::test]
async fn test_missing_metadata_on_first_tracker_falls_through() {
    let harness = TestHarness::new();
    let lookup = Arc::new(MockResolver::empty("alpha-lookup").with_log(harness.log.clone()));
    let a = Arc::new(harness.site("alpha").with_resolver(lookup));
    let b = Arc::new(harness.site("beta"));
    let orchestrator = harness.orchestrator(&[a.clone(), b.clone()], OrchestratorConfig::default(), false);

    let book = harness.book(SICP);
    let report = orchestrator.process_book(&book).await;

    assert!(matches!(
        &report.outcome,
        BookOutcome::Uploaded { tracker, .. } if tracker == "beta"
    ));
    assert_eq!(
        results(&report),
        vec![
            ("alpha".to_string(), AttemptResult::MetadataUnavailable),
            ("beta".to_string(), AttemptResult::Uploaded),
        ]
    );
    assert_eq!(harness.count("alpha-lookup", CallKind::Resolve, "0262510871").await, 1);
    assert_eq!(harness.count("openlibrary", CallKind::Resolve, "0262510871").await, 1);
    assert!(a.submissions().await.is_empty());
    assert!(harness.data_dir.join(SICP).exists());
}

#[tokio::test]
async fn test_packaging_failure_moves_on() {
    let harness = TestHarness::new();
    let a = Arc::new(harness.site("alpha"));
    let b = Arc::new(harness.site("beta"));
    let broken = Arc::new(MockPackager::failing().with_log(harness.log.clone()));
    let orchestrator = harness.orchestrator_with(
        vec![harness.session(&a, broken), harness.session(&b, harness.packager())],
        OrchestratorConfig::default(),
        false,
    );

    let book = harness.book(KR);
    let report = orchestrator.process_book(&book).await;

    assert!(matches!(
        &report.outcome,
        BookOutcome::Uploaded { tracker, .. } if tracker == "beta"
    ));
    let results = results(&report);
    assert_eq!(results.len(), 2);
    assert!(matches!(
        &results[0],
        (tracker, AttemptResult::Failed { error }) if tracker == "alpha" && error.contains("packaging failed")
    ));
    assert_eq!(results[1], ("beta".to_string(), AttemptResult::Uploaded));

    assert!(a.submissions().await.is_empty());
    assert_eq!(b.submissions().await.len(), 1);
    assert!(!orchestrator.sessions()[0].is_disabled());
    assert_eq!(harness.count("mock-packager", CallKind::Package, "9780131103627").await, 2);
    assert!(harness.data_dir.join(KR).exists());
    assert!(!book.path().exists());
}

#[tokio::test]
async fn test_resolver_error_moves_on() {
    let harness = TestHarness::new();
    let lookup = Arc::new(MockResolver::failing("alpha-lookup").with_log(harness.log.clone()));
    let a = Arc::new(harness.site("alpha").with_resolver(lookup));
    let b = Arc::new(harness.site("beta"));
    let orchestrator = harness.orchestrator_with(
        vec![
            harness.session(&a, harness.packager()),
            harness.session(&b, harness.packager()),
        ],
        OrchestratorConfig::default(),
        false,
    );

    let book = harness.book(SICP);
    let report = orchestrator.process_book(&book).await;

    assert!(matches!(
        &report.outcome,
        BookOutcome::Uploaded { tracker, .. } if tracker == "beta"
    ));
    let results = results(&report);
    assert_eq!(results.len(), 2);
    assert!(matches!(
        &results[0],
        (tracker, AttemptResult::Failed { error }) if tracker == "alpha" && error.contains("metadata lookup failed")
    ));
    assert_eq!(results[1], ("beta".to_string(), AttemptResult::Uploaded));

    assert_eq!(harness.count("alpha-lookup", CallKind::Resolve, "0262510871").await, 1);
    assert!(a.submissions().await.is_empty());
    assert!(!orchestrator.sessions()[0].is_disabled());

    // nothing was packaged for alpha
    let packaged = harness.log.calls_to("mock-packager").await;
    assert_eq!(packaged.len(), 1);
    assert_eq!(packaged[0].detail.as_deref(), Some(b.announce_url()));
    assert!(harness.data_dir.join(SICP).exists());
}

#[tokio::test]
async fn test_book_without_isbn_is_skipped() {
    let harness = TestHarness::new();
    let a = Arc::new(harness.site("alpha"));
    let orchestrator = harness.orchestrator(&[a], OrchestratorConfig::default(), false);

    let book = harness.book("the-c-programming-language.epub");
    let report = orchestrator.process_book(&book).await;

    assert_eq!(report.outcome, BookOutcome::Skipped);
    assert!(report.attempts.is_empty());
    assert!(harness.log.calls().await.is_empty());
    assert!(book.path().exists());
    assert!(!harness.data_dir.exists());
}

#[tokio::test]
async fn test_every_tracker_declines() {
    let harness = TestHarness::new();
    let a = Arc::new(harness.site("alpha").with_book("0262510871"));
    let b = Arc::new(harness.site("beta").failing_submit(MockFailure::Rejected));
    let orchestrator = harness.orchestrator(&[a, b], OrchestratorConfig::default(), false);

    let book = harness.book(SICP);
    let report = orchestrator.process_book(&book).await;

    assert!(matches!(report.outcome, BookOutcome::Exhausted { .. }));
    assert_eq!(report.attempts[0].result, AttemptResult::Duplicate);
    assert!(matches!(
        &report.attempts[1].result,
        AttemptResult::Failed { error } if error.contains("HTTP 500")
    ));
    assert!(book.path().exists());
    assert!(!harness.data_dir.exists());
}

#[tokio::test]
async fn test_transport_failure_moves_on() {
    let harness = TestHarness::new();
    let a = Arc::new(harness.site("alpha").failing_search(MockFailure::Transport));
    let b = Arc::new(harness.site("beta"));
    let orchestrator =
        harness.orchestrator(&[a.clone(), b.clone()], OrchestratorConfig::default(), false);

    let first = orchestrator.process_book(&harness.book(KR)).await;
    let second = orchestrator.process_book(&harness.book(SICP)).await;

    // a transport error does not disable the tracker
    for report in [&first, &second] {
        assert!(matches!(report.attempts[0].result, AttemptResult::Failed { .. }));
        assert_eq!(report.attempts[1].result, AttemptResult::Uploaded);
    }
    assert!(!orchestrator.sessions()[0].is_disabled());
    assert_eq!(harness.count("alpha", CallKind::HasBook, "0262510871").await, 1);
}

#[tokio::test]
async fn test_session_expiry_disables_tracker_for_later_books() {
    let harness = TestHarness::new();
    let a = Arc::new(harness.site("alpha").failing_submit(MockFailure::SessionExpired));
    let b = Arc::new(harness.site("beta"));
    let orchestrator =
        harness.orchestrator(&[a.clone(), b.clone()], OrchestratorConfig::default(), false);

    let first = orchestrator.process_book(&harness.book(KR)).await;
    assert!(matches!(
        &first.attempts[0].result,
        AttemptResult::Failed { error } if error.contains("session expired")
    ));
    assert!(orchestrator.sessions()[0].is_disabled());

    let second = orchestrator.process_book(&harness.book(SICP)).await;
    assert_eq!(
        results(&second),
        vec![
            ("alpha".to_string(), AttemptResult::Unavailable),
            ("beta".to_string(), AttemptResult::Uploaded),
        ]
    );

    // the disabled tracker is not contacted again
    assert_eq!(harness.count("alpha", CallKind::HasBook, "0262510871").await, 0);
    assert_eq!(b.submissions().await.len(), 2);
}

#[tokio::test]
async fn test_dry_run_has_no_side_effects() {
    let harness = TestHarness::new();
    let a = Arc::new(harness.site("alpha").with_book("9780131103627"));
    let b = Arc::new(harness.site("beta"));
    let orchestrator = harness.orchestrator(
        &[a, b.clone()],
        OrchestratorConfig::default().with_dry_run(true),
        false,
    );

    let book = harness.book(KR);
    let report = orchestrator.run(std::slice::from_ref(&book)).await;

    assert!(report.dry_run);
    assert_eq!(report.summary.would_upload, 1);
    assert!(matches!(
        &report.books[0].outcome,
        BookOutcome::WouldUpload { tracker, .. } if tracker == "beta"
    ));

    assert_eq!(harness.log.count(CallKind::HasBook).await, 2);
    assert_eq!(harness.log.count(CallKind::Resolve).await, 0);
    assert_eq!(harness.log.count(CallKind::Package).await, 0);
    assert_eq!(harness.log.count(CallKind::Submit).await, 0);
    assert!(book.path().exists());
    assert!(!harness.data_dir.exists());
    assert!(!harness.torrent_dir.exists());
}

#[tokio::test]
async fn test_archive_renaming() {
    let harness = TestHarness::new();
    let a = Arc::new(harness.site("alpha"));
    let orchestrator = harness.orchestrator(&[a], OrchestratorConfig::default(), true);

    let report = orchestrator.process_book(&harness.book(KR)).await;

    let expected = "Lovelace (2001) Book 9780131103627 (isbn9780131103627)";
    match &report.outcome {
        BookOutcome::Uploaded { book, torrent, .. } => {
            assert_eq!(book, &harness.data_dir.join(format!("{}.epub", expected)));
            assert_eq!(torrent, &harness.torrent_dir.join(format!("{}.torrent", expected)));
            assert!(book.exists());
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_archive_failure_keeps_book_and_stops() {
    let harness = TestHarness::new();
    std::fs::create_dir_all(&harness.data_dir).unwrap();
    std::fs::write(harness.data_dir.join(KR), b"already archived").unwrap();

    let a = Arc::new(harness.site("alpha"));
    let b = Arc::new(harness.site("beta"));
    let orchestrator =
        harness.orchestrator(&[a.clone(), b.clone()], OrchestratorConfig::default(), false);

    let book = harness.book(KR);
    let report = orchestrator.process_book(&book).await;

    assert!(matches!(
        &report.outcome,
        BookOutcome::ArchiveFailed { tracker, .. } if tracker == "alpha"
    ));
    assert!(book.path().exists());
    assert!(harness.log.calls_to("beta").await.is_empty());
}

#[tokio::test]
async fn test_concurrent_run_keeps_order_and_per_tracker_sequence() {
    let harness = TestHarness::new();
    let a = Arc::new(harness.site("alpha").with_book("9780131103627"));
    let b = Arc::new(harness.site("beta"));
    let orchestrator = harness.orchestrator(
        &[a.clone(), b.clone()],
        OrchestratorConfig::default().with_jobs(4),
        false,
    );

    std::fs::create_dir_all(&harness.inbox).unwrap();
    std::fs::write(harness.inbox.join("the-art-of-war.txt"), b"x").unwrap();
    harness.book(KR);
    harness.book(SICP);
    harness.book("nested/knuth-0201896834.djvu");
    harness.book("untitled.mobi");

    let books = discover_books(
        &[harness.inbox.clone()],
        &["epub".to_string(), "pdf".to_string(), "djvu".to_string(), "mobi".to_string()],
    )
    .await;
    assert_eq!(books.len(), 4);
    assert!(books.iter().all(|b| !b.path().ends_with("the-art-of-war.txt")));

    let report = orchestrator.run(&books).await;

    let paths: Vec<_> = report.books.iter().map(|b| b.path.clone()).collect();
    let expected: Vec<_> = books.iter().map(|b| b.path().to_path_buf()).collect();
    assert_eq!(paths, expected);

    assert_eq!(report.summary.total, 4);
    assert_eq!(report.summary.uploaded, 3);
    assert_eq!(report.summary.skipped, 1);
    assert_eq!(b.submissions().await.len(), 3);
    assert!(a.submissions().await.is_empty());

    // every submission was preceded by a duplicate check on the same tracker
    let calls = harness.log.calls().await;
    for (i, call) in calls.iter().enumerate() {
        if call.kind == CallKind::Submit {
            assert!(calls[..i].iter().any(|c| c.kind == CallKind::HasBook
                && c.target == call.target
                && c.isbn == call.isbn));
        }
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlinked_inbox_uploads_each_book_once() {
    let harness = TestHarness::new();
    let a = Arc::new(harness.site("alpha"));
    let orchestrator = harness.orchestrator(
        &[a.clone()],
        OrchestratorConfig::default().with_jobs(4),
        false,
    );

    harness.book(KR);
    std::os::unix::fs::symlink(".", harness.inbox.join("loop")).unwrap();
    let spelled_twice = vec![harness.inbox.clone(), harness.inbox.join(".")];

    let books = discover_books(&spelled_twice, &["epub".to_string()]).await;
    assert_eq!(books.len(), 1);

    let report = orchestrator.run(&books).await;

    assert_eq!(report.summary.uploaded, 1);
    assert_eq!(a.submissions().await.len(), 1);
    assert!(harness.data_dir.join(KR).exists());
}
