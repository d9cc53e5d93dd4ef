//! File-based storage implementation.

use super::{BoxFuture, Storage, StorageError, StorageResult};
use crate::document::CanvasDocument;
use std::fs;
use std::path::{Path, PathBuf};

/// Stores documents as pretty-printed JSON files in a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a new file storage with the given base directory.
    ///
    /// Creates the directory if it doesn't exist.
    pub fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StorageError::Io(format!("Failed to create storage directory: {e}"))
            })?;
        }
        Ok(Self { base_path })
    }

    /// Create file storage in the default location,
    /// `<data_local_dir>/blockcanvas/documents`.
    pub fn default_location() -> StorageResult<Self> {
        Self::new(Self::default_path()?)
    }

    /// The default storage directory, without creating it.
    pub fn default_path() -> StorageResult<PathBuf> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;
        Ok(base.join("blockcanvas").join("documents"))
    }

    /// File path for a document id. The id is percent-encoded, so distinct
    /// ids never share a file and `list` can recover them.
    fn document_path(&self, id: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", urlencoding::encode(id)))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

impl Storage for FileStorage {
    fn save(&self, id: &str, document: &CanvasDocument) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.document_path(id);
        let json = document.to_json();

        Box::pin(async move {
            let json = json.map_err(|e| StorageError::Serialization(e.to_string()))?;
            // Write-then-rename so a crash never leaves a truncated document.
            let tmp = path.with_extension("json.tmp");
            fs::write(&tmp, json).map_err(|e| {
                StorageError::Io(format!("Failed to write {}: {e}", tmp.display()))
            })?;
            fs::rename(&tmp, &path).map_err(|e| {
                StorageError::Io(format!("Failed to replace {}: {e}", path.display()))
            })
        })
    }

    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<CanvasDocument>> {
        let path = self.document_path(id);
        let id = id.to_string();

        Box::pin(async move {
            if !path.exists() {
                return Err(StorageError::NotFound(id));
            }
            let json = fs::read_to_string(&path).map_err(|e| {
                StorageError::Io(format!("Failed to read {}: {e}", path.display()))
            })?;
            let mut document = CanvasDocument::from_json(&json).map_err(|e| {
                StorageError::Serialization(format!("Failed to parse {}: {e}", path.display()))
            })?;
            if document.repair() {
                log::warn!("Repaired block order of {}", path.display());
            }
            Ok(document)
        })
    }

    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.document_path(id);

        Box::pin(async move {
            if path.exists() {
                fs::remove_file(&path).map_err(|e| {
                    StorageError::Io(format!("Failed to delete {}: {e}", path.display()))
                })?;
            }
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        let base = self.base_path.clone();

        Box::pin(async move {
            if !base.exists() {
                return Ok(vec![]);
            }
            let entries = fs::read_dir(&base)
                .map_err(|e| StorageError::Io(format!("Failed to read directory: {e}")))?;

            let mut ids: Vec<String> = entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
                .filter_map(|path| {
                    let stem = path.file_stem()?.to_str()?;
                    match urlencoding::decode(stem) {
                        Ok(id) => Some(id.into_owned()),
                        Err(e) => {
                            log::warn!("Skipping {}: {e}", path.display());
                            None
                        }
                    }
                })
                .collect();
            ids.sort();
            Ok(ids)
        })
    }

    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let path = self.document_path(id);
        Box::pin(async move { Ok(path.exists()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_file_storage_save_load() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();

        let mut doc = CanvasDocument::new();
        doc.name = "Wedding site".to_string();

        storage.save("test-doc", &doc).await.unwrap();
        let loaded = storage.load("test-doc").await.unwrap();

        assert_eq!(loaded, doc);
    }

    #[tokio::test]
    async fn test_file_storage_not_found() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();

        let result = storage.load("nonexistent").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_file_storage_list() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();

        let doc = CanvasDocument::new();
        storage.save("doc2", &doc).await.unwrap();
        storage.save("doc1", &doc).await.unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        assert_eq!(storage.list().await.unwrap(), vec!["doc1", "doc2"]);
    }

    #[tokio::test]
    async fn test_file_storage_delete() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();

        let doc = CanvasDocument::new();
        storage.save("test", &doc).await.unwrap();
        assert!(storage.exists("test").await.unwrap());

        storage.delete("test").await.unwrap();
        assert!(!storage.exists("test").await.unwrap());
    }

    #[tokio::test]
    async fn test_file_storage_encodes_id() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();

        let mut slashed = CanvasDocument::new();
        slashed.name = "slashed".to_string();
        let mut underscored = CanvasDocument::new();
        underscored.name = "underscored".to_string();

        storage.save("a/b", &slashed).await.unwrap();
        storage.save("a_b", &underscored).await.unwrap();
        storage.save("../escape", &slashed).await.unwrap();

        assert_eq!(storage.load("a/b").await.unwrap().name, "slashed");
        assert_eq!(storage.load("a_b").await.unwrap().name, "underscored");
        assert_eq!(
            storage.list().await.unwrap(),
            vec!["../escape", "a/b", "a_b"]
        );
        assert!(!dir.path().parent().unwrap().join("escape.json").exists());
    }

    #[tokio::test]
    async fn test_file_storage_creates_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let storage = FileStorage::new(&nested).unwrap();
        assert_eq!(storage.base_path(), nested.as_path());
        assert!(nested.is_dir());
    }
}
