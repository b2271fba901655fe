//! Types for the upload orchestrator.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::identifier::Isbn;
use crate::metadata::{Metadata, MetadataError};
use crate::packager::{PackagerError, TorrentDescriptor};
use crate::tracker::TrackerError;

/// Errors that end one upload attempt. None of them is fatal for the run.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("metadata lookup failed: {0}")]
    Metadata(#[from] MetadataError),

    #[error("packaging failed: {0}")]
    Packaging(#[from] PackagerError),

    #[error("submission failed: {0}")]
    Tracker(#[from] TrackerError),
}

impl UploadError {
    /// Whether the tracker session can no longer be used.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::Tracker(e) if e.is_session_expired())
    }
}

/// What an accepted upload leaves behind for archival.
#[derive(Debug)]
pub struct UploadReceipt {
    pub torrent: TorrentDescriptor,
    pub metadata: Metadata,
}

/// Result of trying one tracker for one book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AttemptResult {
    /// The tracker already has the ISBN.
    Duplicate,
    /// No metadata for the ISBN.
    MetadataUnavailable,
    /// Dry run stopped before packaging.
    WouldUpload,
    /// The tracker accepted the upload.
    Uploaded,
    /// The session was disabled earlier in the run.
    Unavailable,
    /// Transport, packaging or submission failure.
    Failed { error: String },
}

/// One tracker attempt, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackerAttempt {
    pub tracker: String,
    #[serde(flatten)]
    pub result: AttemptResult,
}

impl TrackerAttempt {
    pub fn new(tracker: impl Into<String>, result: AttemptResult) -> Self {
        Self {
            tracker: tracker.into(),
            result,
        }
    }
}

/// Terminal state of one book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BookOutcome {
    /// No ISBN in the file name. No tracker was contacted.
    Skipped,
    /// Accepted by `tracker` and archived.
    Uploaded {
        isbn: Isbn,
        tracker: String,
        book: PathBuf,
        torrent: PathBuf,
    },
    /// Accepted by `tracker`, but archiving failed. The book stays in place.
    ArchiveFailed {
        isbn: Isbn,
        tracker: String,
        error: String,
    },
    /// Dry run: `tracker` would have received the upload.
    WouldUpload { isbn: Isbn, tracker: String },
    /// No tracker accepted the book.
    Exhausted { isbn: Isbn },
}

impl BookOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Uploaded { .. } => "uploaded",
            Self::ArchiveFailed { .. } => "archive_failed",
            Self::WouldUpload { .. } => "would_upload",
            Self::Exhausted { .. } => "exhausted",
        }
    }
}

/// Everything that happened to one book.
#[derive(Debug, Clone, Serialize)]
pub struct BookReport {
    pub path: PathBuf,
    #[serde(flatten)]
    pub outcome: BookOutcome,
    pub attempts: Vec<TrackerAttempt>,
    pub finished_at: DateTime<Utc>,
}

impl BookReport {
    pub fn new(path: impl Into<PathBuf>, outcome: BookOutcome, attempts: Vec<TrackerAttempt>) -> Self {
        Self {
            path: path.into(),
            outcome,
            attempts,
            finished_at: Utc::now(),
        }
    }
}

/// Counts per outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub skipped: usize,
    pub uploaded: usize,
    pub archive_failed: usize,
    pub would_upload: usize,
    pub exhausted: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} books: {} uploaded, {} exhausted, {} skipped",
            self.total, self.uploaded, self.exhausted, self.skipped
        )?;
        if self.archive_failed > 0 {
            write!(f, ", {} archive failures", self.archive_failed)?;
        }
        if self.would_upload > 0 {
            write!(f, ", {} would upload", self.would_upload)?;
        }
        Ok(())
    }
}

/// Report of one orchestration pass. Books keep discovery order.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub summary: RunSummary,
    pub books: Vec<BookReport>,
}

impl RunReport {
    pub fn new(started_at: DateTime<Utc>, dry_run: bool, books: Vec<BookReport>) -> Self {
        let mut summary = RunSummary {
            total: books.len(),
            ..RunSummary::default()
        };
        for book in &books {
            match book.outcome {
                BookOutcome::Skipped => summary.skipped += 1,
                BookOutcome::Uploaded { .. } => summary.uploaded += 1,
                BookOutcome::ArchiveFailed { .. } => summary.archive_failed += 1,
                BookOutcome::WouldUpload { .. } => summary.would_upload += 1,
                BookOutcome::Exhausted { .. } => summary.exhausted += 1,
            }
        }

        Self {
            started_at,
            finished_at: Utc::now(),
            dry_run,
            summary,
            books,
        }
    }
}
