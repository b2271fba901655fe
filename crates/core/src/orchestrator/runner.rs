//! Upload orchestrator implementation.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use crate::archive::BookArchiver;
use crate::discovery::BookFile;

use super::config::OrchestratorConfig;
use super::session::TrackerSession;
use super::types::{AttemptResult, BookOutcome, BookReport, RunReport, TrackerAttempt};

/// Drives books through the tracker sessions.
#[derive(Debug)]
pub struct UploadOrchestrator {
    sessions: Vec<TrackerSession>,
    archiver: BookArchiver,
    config: OrchestratorConfig,
}

impl UploadOrchestrator {
    /// `sessions` are tried in the given order for every book.
    pub fn new(
        sessions: Vec<TrackerSession>,
        archiver: BookArchiver,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            sessions,
            archiver,
            config,
        }
    }

    pub fn sessions(&self) -> &[TrackerSession] {
        &self.sessions
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Process every book. The report lists books in input order.
    pub async fn run(&self, books: &[BookFile]) -> RunReport {
        let started_at = Utc::now();
        info!(
            books = books.len(),
            trackers = self.sessions.len(),
            jobs = self.config.concurrency(),
            dry_run = self.config.dry_run,
            "Starting upload run"
        );

        let reports: Vec<BookReport> = stream::iter(books)
            .map(|book| self.process_book(book))
            .buffered(self.config.concurrency())
            .collect()
            .await;

        RunReport::new(started_at, self.config.dry_run, reports)
    }

    /// Take one book through the trackers until one accepts it.
    pub async fn process_book(&self, book: &BookFile) -> BookReport {
        let path = book.path();

        let Some(isbn) = book.isbn() else {
            debug!(book = %path.display(), "No ISBN in file name, skipping");
            return BookReport::new(path, BookOutcome::Skipped, Vec::new());
        };

        let mut attempts = Vec::new();

        for session in &self.sessions {
            let tracker = session.name();

            if session.is_disabled() {
                attempts.push(TrackerAttempt::new(tracker, AttemptResult::Unavailable));
                continue;
            }

            match session.has_book(&isbn).await {
                Ok(true) => {
                    info!(book = %path.display(), tracker = %tracker, isbn = %isbn, "Already on tracker");
                    attempts.push(TrackerAttempt::new(tracker, AttemptResult::Duplicate));
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    if e.is_session_expired() {
                        session.disable();
                    }
                    warn!(book = %path.display(), tracker = %tracker, error = %e, "Duplicate check failed");
                    attempts.push(TrackerAttempt::new(
                        tracker,
                        AttemptResult::Failed {
                            error: e.to_string(),
                        },
                    ));
                    continue;
                }
            }

            if self.config.dry_run {
                info!(book = %path.display(), tracker = %tracker, isbn = %isbn, "Would upload");
                attempts.push(TrackerAttempt::new(tracker, AttemptResult::WouldUpload));
                let outcome = BookOutcome::WouldUpload {
                    isbn,
                    tracker: tracker.to_string(),
                };
                return BookReport::new(path, outcome, attempts);
            }

            let receipt = match session.upload(path, &isbn).await {
                Ok(Some(receipt)) => receipt,
                Ok(None) => {
                    info!(book = %path.display(), tracker = %tracker, isbn = %isbn, "No metadata found");
                    attempts.push(TrackerAttempt::new(tracker, AttemptResult::MetadataUnavailable));
                    continue;
                }
                Err(e) => {
                    if e.is_session_expired() {
                        session.disable();
                    }
                    warn!(book = %path.display(), tracker = %tracker, error = %e, "Upload failed");
                    attempts.push(TrackerAttempt::new(
                        tracker,
                        AttemptResult::Failed {
                            error: e.to_string(),
                        },
                    ));
                    continue;
                }
            };

            attempts.push(TrackerAttempt::new(tracker, AttemptResult::Uploaded));

            let outcome = match self
                .archiver
                .archive(path, &receipt.torrent, &receipt.metadata)
                .await
            {
                Ok(archived) => {
                    info!(book = %path.display(), tracker = %tracker, "Uploaded");
                    BookOutcome::Uploaded {
                        isbn,
                        tracker: tracker.to_string(),
                        book: archived.book,
                        torrent: archived.torrent,
                    }
                }
                Err(e) => {
                    error!(
                        book = %path.display(),
                        tracker = %tracker,
                        error = %e,
                        "Uploaded but archiving failed"
                    );
                    BookOutcome::ArchiveFailed {
                        isbn,
                        tracker: tracker.to_string(),
                        error: e.to_string(),
                    }
                }
            };

            return BookReport::new(path, outcome, attempts);
        }

        info!(book = %path.display(), isbn = %isbn, "No tracker accepted the book");
        BookReport::new(path, BookOutcome::Exhausted { isbn }, attempts)
    }
}
