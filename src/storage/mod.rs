//! Storage layer abstraction.
//!
//! Two backends live behind the [`StorageBackend`] contract:
//! - **Snapshot**: the whole collection as one JSON document per save
//! - **`SQLite`**: one row per task, with single-row save/delete capabilities
//!
//! The active backend is selected once at startup by [`create_backend`] and
//! never revisited per call.

mod snapshot;
mod sqlite;
mod traits;

pub use snapshot::SnapshotBackend;
pub use sqlite::SqliteBackend;
pub use traits::StorageBackend;

use crate::config::{BackendKind, TaskdeckConfig};
use crate::Result;

/// Builds the storage backend selected by the configuration.
///
/// # Errors
///
/// Returns an error if the `SQLite` database cannot be opened or initialized.
/// The snapshot backend defers all I/O to its first load/save.
pub fn create_backend(config: &TaskdeckConfig) -> Result<Box<dyn StorageBackend>> {
    match config.backend {
        BackendKind::Snapshot => {
            let path = config.snapshot_path();
            tracing::debug!(path = %path.display(), "Using snapshot storage backend");
            Ok(Box::new(SnapshotBackend::new(path)))
        },
        BackendKind::Sqlite => {
            let path = config.sqlite_path();
            tracing::debug!(path = %path.display(), "Using SQLite storage backend");
            Ok(Box::new(SqliteBackend::new(path)?))
        },
    }
}
