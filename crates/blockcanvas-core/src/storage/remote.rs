//! Remote persistence tier.

use super::BoxFuture;
use crate::document::CanvasDocument;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;

/// Remote write errors.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote rejected the credential")]
    Unauthorized,
    #[error("remote write failed: {0}")]
    Failed(String),
    #[error("remote write timed out after {0:?}")]
    Timeout(Duration),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Authenticated remote store. Only called when a credential is configured.
pub trait RemoteStore: Send + Sync {
    fn write(
        &self,
        document_id: &str,
        credential: &str,
        document: &CanvasDocument,
    ) -> BoxFuture<'_, RemoteResult<()>>;
}

/// One accepted write, as recorded by [`MemoryRemote`].
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteWrite {
    pub document_id: String,
    pub credential: String,
    pub document: CanvasDocument,
}

/// In-memory remote for tests and offline runs.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    writes: Mutex<Vec<RemoteWrite>>,
    failing: AtomicBool,
    latency: Duration,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every write by `latency` (tokio time).
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Accepted writes, oldest first.
    pub fn writes(&self) -> Vec<RemoteWrite> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }
}

impl RemoteStore for MemoryRemote {
    fn write(
        &self,
        document_id: &str,
        credential: &str,
        document: &CanvasDocument,
    ) -> BoxFuture<'_, RemoteResult<()>> {
        let write = RemoteWrite {
            document_id: document_id.to_string(),
            credential: credential.to_string(),
            document: document.clone(),
        };
        Box::pin(async move {
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            if write.credential.is_empty() {
                return Err(RemoteError::Unauthorized);
            }
            if self.failing.load(Ordering::SeqCst) {
                return Err(RemoteError::Failed("remote unavailable".to_string()));
            }
            self.writes
                .lock()
                .map_err(|e| RemoteError::Failed(format!("Lock error: {e}")))?
                .push(write);
            Ok(())
        })
    }
}
