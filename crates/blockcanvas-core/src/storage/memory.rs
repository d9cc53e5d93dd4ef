//! Process-local document store.

use super::{BoxFuture, Storage, StorageError, StorageResult};
use crate::document::CanvasDocument;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Keeps document snapshots in a map; used by tests and the CLI's offline
/// runs. Keys iterate in sorted order, which `list` relies on.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    snapshots: RwLock<BTreeMap<String, CanvasDocument>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, the last-document snapshot included.
    pub fn len(&self) -> usize {
        self.read().map_or(0, |snapshots| snapshots.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> StorageResult<RwLockReadGuard<'_, BTreeMap<String, CanvasDocument>>> {
        self.snapshots
            .read()
            .map_err(|e| StorageError::Unavailable(e.to_string()))
    }

    fn write(&self) -> StorageResult<RwLockWriteGuard<'_, BTreeMap<String, CanvasDocument>>> {
        self.snapshots
            .write()
            .map_err(|e| StorageError::Unavailable(e.to_string()))
    }
}

impl Storage for MemoryStorage {
    fn save(&self, id: &str, document: &CanvasDocument) -> BoxFuture<'_, StorageResult<()>> {
        let result = self
            .write()
            .map(|mut snapshots| {
                snapshots.insert(id.to_string(), document.clone());
            });
        Box::pin(async move { result })
    }

    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<CanvasDocument>> {
        let result = self.read().and_then(|snapshots| {
            snapshots
                .get(id)
                .cloned()
                .ok_or_else(|| StorageError::NotFound(id.to_string()))
        });
        Box::pin(async move { result })
    }

    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let result = self.write().map(|mut snapshots| {
            snapshots.remove(id);
        });
        Box::pin(async move { result })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        let result = self.read().map(|snapshots| snapshots.keys().cloned().collect());
        Box::pin(async move { result })
    }

    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let result = self.read().map(|snapshots| snapshots.contains_key(id));
        Box::pin(async move { result })
    }
}
