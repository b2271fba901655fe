//! Upload orchestration.
//!
//! The orchestrator drives each discovered book through the tracker sessions
//! in configured order:
//! - **Identify**: no ISBN in the file name means the book is skipped
//! - **Check**: a tracker that already has the ISBN is passed over
//! - **Upload**: resolve metadata, package, submit
//! - **Archive**: the first accepted upload archives book and torrent and ends
//!   the book's pass
//!
//! Books may be processed concurrently; the trackers for one book never are.

mod config;
mod runner;
mod session;
mod types;

pub use config::OrchestratorConfig;
pub use runner::UploadOrchestrator;
pub use session::{open_sessions, TrackerSession};
pub use types::{
    AttemptResult, BookOutcome, BookReport, RunReport, RunSummary, TrackerAttempt, UploadError,
    UploadReceipt,
};
