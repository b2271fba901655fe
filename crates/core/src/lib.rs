pub mod archive;
pub mod config;
pub mod discovery;
pub mod epub;
pub mod http;
pub mod identifier;
pub mod metadata;
pub mod orchestrator;
pub mod packager;
pub mod testing;
pub mod tracker;

pub use archive::{archive_name, ArchivedBook, ArchiveError, BookArchiver};
pub use config::{
    load_config, load_config_from_str, validate_config, write_default_config, Config, ConfigError,
    GlobalConfig, TrackerCredentials,
};
pub use discovery::{discover_books, BookFile};
pub use epub::{read_epub_metadata, EpubError, EpubMetadata, MetaValue};
pub use http::{build_client, HttpOptions};
pub use identifier::Isbn;
pub use metadata::{Metadata, MetadataError, MetadataResolver, OpenLibraryResolver};
pub use orchestrator::{
    open_sessions, AttemptResult, BookOutcome, BookReport, OrchestratorConfig, RunReport,
    RunSummary, TrackerAttempt, TrackerSession, UploadError, UploadOrchestrator,
};
pub use packager::{MktorrentPackager, PackagerError, TorrentDescriptor, TorrentPackager};
pub use tracker::{AuthError, HttpTracker, TrackerError, TrackerKind, TrackerProfile, TrackerSite};
