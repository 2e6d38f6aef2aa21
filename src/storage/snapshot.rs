//! Snapshot-file storage backend.
//!
//! Persists the entire collection as one pretty-printed JSON document at a
//! fixed path. Simple and transparent: the file can be inspected or edited
//! by hand between operations, and every operation re-reads it.
//!
//! There is no partial-write atomicity beyond what `fs::write` offers; a
//! crash mid-write can corrupt the document. Corruption degrades to an
//! empty collection on the next load instead of failing the caller.

use crate::models::TaskCollection;
use crate::storage::traits::StorageBackend;
use crate::{Error, Result};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

/// Snapshot-file storage backend.
pub struct SnapshotBackend {
    /// Path of the JSON document.
    path: PathBuf,
}

impl SnapshotBackend {
    /// Creates a new snapshot backend writing to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the document path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageBackend for SnapshotBackend {
    fn name(&self) -> &'static str {
        "snapshot"
    }

    fn load(&self) -> Result<TaskCollection> {
        if !self.path.exists() {
            return Ok(TaskCollection::empty());
        }

        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to read snapshot document, starting with an empty collection"
                );
                return Ok(TaskCollection::empty());
            },
        };

        match serde_json::from_str::<TaskCollection>(&json) {
            Ok(collection) => Ok(collection),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Snapshot document is not valid, starting with an empty collection"
                );
                Ok(TaskCollection::empty())
            },
        }
    }

    fn save_all(&self, collection: &mut TaskCollection) -> Result<()> {
        collection.last_updated = Utc::now();

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::OperationFailed {
                operation: "create_data_dir".to_string(),
                cause: e.to_string(),
            })?;
        }

        let json =
            serde_json::to_string_pretty(collection).map_err(|e| Error::OperationFailed {
                operation: "serialize_snapshot".to_string(),
                cause: e.to_string(),
            })?;

        fs::write(&self.path, json).map_err(|e| Error::OperationFailed {
            operation: "write_snapshot".to_string(),
            cause: e.to_string(),
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Status, Task};
    use tempfile::TempDir;

    fn backend_in(dir: &TempDir) -> SnapshotBackend {
        SnapshotBackend::new(dir.path().join("tasks.json"))
    }

    #[test]
    fn test_load_missing_file_yields_empty() {
        let dir = TempDir::new().unwrap();
        let backend = backend_in(&dir);

        let collection = backend.load().unwrap();
        assert!(collection.tasks.is_empty());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let backend = backend_in(&dir);

        let mut collection = TaskCollection::empty();
        let mut task = Task::new("Ship release");
        task.due_date = Some("2025-12-01".to_string());
        collection.tasks.push(task.clone());

        backend.save_all(&mut collection).unwrap();

        let loaded = backend.load().unwrap();
        assert_eq!(loaded.tasks.len(), 1);
        assert_eq!(loaded.tasks[0], task);
        assert_eq!(loaded.tasks[0].status, Status::Pending);
    }

    #[test]
    fn test_corrupt_document_degrades_to_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.json");
        std::fs::write(&path, "{ not json").unwrap();

        let backend = SnapshotBackend::new(&path);
        let collection = backend.load().unwrap();
        assert!(collection.tasks.is_empty());
    }

    #[test]
    fn test_save_stamps_last_updated() {
        let dir = TempDir::new().unwrap();
        let backend = backend_in(&dir);

        let mut collection = TaskCollection::empty();
        let before = collection.last_updated;
        std::thread::sleep(std::time::Duration::from_millis(5));
        backend.save_all(&mut collection).unwrap();

        assert!(collection.last_updated > before);
    }

    #[test]
    fn test_save_creates_missing_directories() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("deep").join("tasks.json");
        let backend = SnapshotBackend::new(&nested);

        backend.save_all(&mut TaskCollection::empty()).unwrap();
        assert!(nested.exists());
    }

    #[test]
    fn test_document_is_camel_case_and_pretty() {
        let dir = TempDir::new().unwrap();
        let backend = backend_in(&dir);

        let mut collection = TaskCollection::empty();
        collection.tasks.push(Task::new("Inspect me"));
        backend.save_all(&mut collection).unwrap();

        let text = std::fs::read_to_string(backend.path()).unwrap();
        assert!(text.contains("\"lastUpdated\""));
        assert!(text.contains("\"createdAt\""));
        assert!(text.contains('\n'));
    }

    #[test]
    fn test_row_ops_not_supported() {
        let dir = TempDir::new().unwrap();
        let backend = backend_in(&dir);
        assert!(!backend.supports_row_ops());
        assert!(matches!(
            backend.save_one(&Task::new("x")),
            Err(crate::Error::NotImplemented(_))
        ));
    }
}
