//! Shared call recording for mocks.

use std::sync::Arc;
use tokio::sync::RwLock;

/// The mocked operation that was called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    HasBook,
    Submit,
    Resolve,
    Package,
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Name of the mock that was called.
    pub target: String,
    pub kind: CallKind,
    pub isbn: Option<String>,
    /// Call-specific detail (announce URL for packaging, book path for submission).
    pub detail: Option<String>,
}

/// Ordered log of calls, cheap to clone and share between mocks.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<RwLock<Vec<RecordedCall>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(
        &self,
        target: &str,
        kind: CallKind,
        isbn: Option<String>,
        detail: Option<String>,
    ) {
        self.calls.write().await.push(RecordedCall {
            target: target.to_string(),
            kind,
            isbn,
            detail,
        });
    }

    /// All calls in the order they happened.
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.read().await.clone()
    }

    /// Calls made to one mock.
    pub async fn calls_to(&self, target: &str) -> Vec<RecordedCall> {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| c.target == target)
            .cloned()
            .collect()
    }

    pub async fn count(&self, kind: CallKind) -> usize {
        self.calls.read().await.iter().filter(|c| c.kind == kind).count()
    }

    pub async fn clear(&self) {
        self.calls.write().await.clear();
    }
}
