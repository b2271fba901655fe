use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bookseed_core::{
    build_client, discover_books, load_config, open_sessions, read_epub_metadata,
    validate_config, write_default_config, BookArchiver, Config, ConfigError, HttpOptions,
    MetadataResolver,
    MktorrentPackager, OpenLibraryResolver, OrchestratorConfig, RunReport, TorrentPackager,
    UploadOrchestrator,
};

/// Exit code after writing a fresh default config.
const EXIT_CONFIG_CREATED: u8 = 2;

#[derive(Debug, Parser)]
#[command(
    name = "bookseed",
    version,
    about = "Cross-post e-books to private trackers",
    args_conflicts_with_subcommands = true,
    subcommand_negates_reqs = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    upload: UploadArgs,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the metadata embedded in EPUB files
    List {
        #[arg(value_name = "FILE", required = true, num_args = 1..)]
        files: Vec<PathBuf>,

        /// Print one JSON object per file instead of text
        #[arg(long)]
        json: bool,
    },
}

/// Upload every book found under the given directories.
#[derive(Debug, Args)]
struct UploadArgs {
    /// Directories to search for books
    #[arg(value_name = "BOOK_DIR", required = true, num_args = 1..)]
    book_dirs: Vec<PathBuf>,

    /// Configuration file, created with defaults when missing
    #[arg(short, long, env = "BOOKSEED_CONFIG", default_value = "bookseed.toml")]
    config: PathBuf,

    /// Books processed concurrently (overrides global.jobs)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Check trackers without uploading or moving anything
    #[arg(long)]
    dry_run: bool,

    /// Write the run report as JSON
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Some(Command::List { files, json }) => list(&files, json),
        None => run(cli.upload).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("Fatal error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(args: UploadArgs) -> Result<ExitCode> {
    let Some(config) = load_or_scaffold(&args.config)? else {
        println!(
            "Created a default configuration at {}. Edit it to add your tracker credentials, then run bookseed again.",
            args.config.display()
        );
        return Ok(ExitCode::from(EXIT_CONFIG_CREATED));
    };
    validate_config(&config).context("Configuration validation failed")?;

    let jobs = args.jobs.unwrap_or(config.global.jobs);
    let options = HttpOptions::from_timeout_secs(config.global.timeout_secs);

    let books = discover_books(&args.book_dirs, &config.global.extensions).await;
    info!(count = books.len(), "Books discovered");

    let packager: Arc<dyn TorrentPackager> =
        Arc::new(MktorrentPackager::new(config.packager.clone()));
    if let Err(e) = packager.validate().await {
        warn!(packager = %packager.name(), error = %e, "Torrent packager unavailable, uploads will fail");
    }

    let lookup_client = build_client(&options, false).context("Failed to build HTTP client")?;
    let resolver: Arc<dyn MetadataResolver> = Arc::new(OpenLibraryResolver::new(
        lookup_client,
        config.lookup.url.clone(),
    ));

    let sessions = open_sessions(&config, &options, resolver, packager).await;
    if sessions.is_empty() {
        warn!("No tracker is available; books with an ISBN will not be uploaded");
    }

    let orchestrator = UploadOrchestrator::new(
        sessions,
        BookArchiver::from_config(&config.global),
        OrchestratorConfig::from_global(&config.global)
            .with_jobs(jobs)
            .with_dry_run(args.dry_run),
    );

    let report = orchestrator.run(&books).await;
    info!(summary = %report.summary, "Run complete");

    if let Some(path) = &args.report {
        write_report(path, &report).await?;
        info!(path = %path.display(), "Report written");
    }

    Ok(ExitCode::SUCCESS)
}

/// Print embedded EPUB metadata for each file. Unreadable files are logged
/// and make the exit status non-zero.
fn list(files: &[PathBuf], json: bool) -> Result<ExitCode> {
    let mut failed = 0;

    for path in files {
        let metadata = match read_epub_metadata(path) {
            Ok(metadata) => metadata,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Cannot read EPUB metadata");
                failed += 1;
                continue;
            }
        };

        if json {
            let entry = serde_json::json!({ "path": path, "metadata": metadata });
            println!("{}", serde_json::to_string(&entry).context("Failed to serialize metadata")?);
        } else {
            println!("----");
            println!("- path: {}", path.display());
            print!("{}", metadata);
            if let Some(isbn) = metadata.isbn() {
                println!("- isbn: {}", isbn);
            }
            println!();
        }
    }

    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Load the config, or write the default one and return `None` when the file
/// does not exist yet.
fn load_or_scaffold(path: &Path) -> Result<Option<Config>> {
    info!("Loading configuration from {:?}", path);
    match load_config(path) {
        Ok(config) => Ok(Some(config)),
        Err(ConfigError::FileNotFound(_)) => {
            write_default_config(path)
                .with_context(|| format!("Failed to write default config to {:?}", path))?;
            Ok(None)
        }
        Err(e) => Err(e).with_context(|| format!("Failed to load config from {:?}", path)),
    }
}

async fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write report to {:?}", path))
}
