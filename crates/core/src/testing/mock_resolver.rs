//! Mock metadata resolver for testing.

use async_trait::async_trait;

use super::call_log::{CallKind, CallLog};
use super::fixtures;
use crate::identifier::Isbn;
use crate::metadata::{Metadata, MetadataError, MetadataResolver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Found,
    Empty,
    Failing,
}

/// Mock implementation of the MetadataResolver trait.
///
/// Resolves every ISBN to [`fixtures::metadata`], to nothing, or to an error.
#[derive(Debug)]
pub struct MockResolver {
    name: String,
    mode: Mode,
    log: CallLog,
}

impl MockResolver {
    /// Resolver that finds every ISBN.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mode: Mode::Found,
            log: CallLog::new(),
        }
    }

    /// Resolver with no results.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            mode: Mode::Empty,
            ..Self::new(name)
        }
    }

    /// Resolver whose lookups fail.
    pub fn failing(name: impl Into<String>) -> Self {
        Self {
            mode: Mode::Failing,
            ..Self::new(name)
        }
    }

    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }
}

#[async_trait]
impl MetadataResolver for MockResolver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn resolve(&self, isbn: &Isbn) -> Result<Option<Metadata>, MetadataError> {
        self.log
            .record(&self.name, CallKind::Resolve, Some(isbn.to_string()), None)
            .await;

        match self.mode {
            Mode::Found => Ok(Some(fixtures::metadata(isbn))),
            Mode::Empty => Ok(None),
            Mode::Failing => Err(MetadataError::Parse("mock lookup failure".to_string())),
        }
    }
}
