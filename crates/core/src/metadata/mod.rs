//! Bibliographic metadata resolution.
//!
//! A [`MetadataResolver`] maps an ISBN to [`Metadata`]. Two implementations
//! exist: [`OpenLibraryResolver`] queries the public Open Library books API,
//! and [`TrackerLookupResolver`] queries a tracker's own lookup endpoint, which
//! requires the tracker session's authorization key.
//!
//! An unknown ISBN is `Ok(None)`, not an error. Resolvers never retry and never
//! cache.

mod openlibrary;
mod record;
mod tracker;

pub use openlibrary::OpenLibraryResolver;
pub use record::BookRecord;
pub use tracker::TrackerLookupResolver;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identifier::Isbn;

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}").unwrap());

/// Errors that can occur while resolving metadata.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Lookup service answered with an error status.
    #[error("lookup service returned HTTP {status}")]
    Status { status: u16 },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),
}

/// Bibliographic data for one book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// ISBN the lookup was made with.
    pub isbn: Isbn,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
    /// Cover image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Metadata {
    /// Minimal metadata with only a title.
    pub fn new(isbn: Isbn, title: impl Into<String>) -> Self {
        Self {
            isbn,
            title: title.into(),
            authors: Vec::new(),
            publisher: None,
            year: None,
            pages: None,
            image: None,
            description: None,
        }
    }

    /// Authors joined for a single form field.
    pub fn authors_joined(&self) -> String {
        self.authors.join(", ")
    }
}

/// Resolves ISBNs to bibliographic metadata.
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    /// Returns the name of this resolver implementation.
    fn name(&self) -> &str;

    /// Look up an ISBN. `Ok(None)` means the service does not know it.
    async fn resolve(&self, isbn: &Isbn) -> Result<Option<Metadata>, MetadataError>;
}

/// First four-digit run of a free-form date ("June 1988", "1988-04-01").
pub(crate) fn parse_year(date: &str) -> Option<u32> {
    YEAR_RE.find(date).and_then(|m| m.as_str().parse().ok())
}
