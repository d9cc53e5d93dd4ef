//! Persistence tiers for canvas documents.
//!
//! The local tier ([`Storage`]) is keyed by document id and must succeed for
//! a save to count. The remote tier ([`RemoteStore`]) is best effort and only
//! written when a credential is configured. [`AutoSave`] drives both.

mod autosave;
mod file;
mod memory;
mod remote;

pub use autosave::{
    AutoSave, AutoSaveConfig, DEFAULT_DEBOUNCE, DEFAULT_REMOTE_TIMEOUT, SaveError, SaveState,
    SaveStatus, restore, restore_last,
};
pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use remote::{MemoryRemote, RemoteError, RemoteResult, RemoteStore, RemoteWrite};

use crate::document::CanvasDocument;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Key for the "last document" snapshot kept next to every local save.
pub const LAST_DOCUMENT_KEY: &str = "__last_document__";

/// Failure of the local tier.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("no stored document `{0}`")]
    NotFound(String),
    #[error("document could not be encoded or decoded: {0}")]
    Serialization(String),
    #[error("storage I/O failed: {0}")]
    Io(String),
    /// Backend state is unusable, e.g. a poisoned lock.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Future handed back by both persistence tiers. `Send` so the auto-save
/// worker task can await it.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Local tier: whole [`CanvasDocument`] snapshots keyed by document id.
///
/// Besides one entry per document, the auto-save pipeline writes every saved
/// document under [`LAST_DOCUMENT_KEY`] as well.
pub trait Storage: Send + Sync {
    /// Store `document` under `id`, replacing any previous snapshot.
    fn save(&self, id: &str, document: &CanvasDocument) -> BoxFuture<'_, StorageResult<()>>;

    /// Snapshot stored under `id`; [`StorageError::NotFound`] if there is none.
    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<CanvasDocument>>;

    /// Forget `id`. Deleting a missing id succeeds.
    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// Every stored key, sorted, [`LAST_DOCUMENT_KEY`] included.
    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>>;

    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>>;
}
