//! Storage backend trait.

use crate::models::{Task, TaskCollection, TaskId};
use crate::{Error, Result};

/// Trait for task storage backends.
///
/// Backends are the authoritative source of truth for the task collection.
/// Every backend supports whole-collection load and save; row-oriented
/// backends additionally expose single-row operations, advertised through
/// [`Self::supports_row_ops`]. Callers that want per-row efficiency probe
/// the capability first and fall back to load-all/mutate/save-all when it
/// is absent.
pub trait StorageBackend: Send + Sync {
    /// Short backend name for logs and status output.
    fn name(&self) -> &'static str;

    /// Loads the full task collection.
    fn load(&self) -> Result<TaskCollection>;

    /// Persists the full collection, stamping `last_updated` to now.
    ///
    /// Row-oriented backends upsert every task but do not remove rows absent
    /// from `collection`; delete paths must use [`Self::delete_one`] where
    /// supported.
    fn save_all(&self, collection: &mut TaskCollection) -> Result<()>;

    /// Whether single-row save/delete operations are available.
    fn supports_row_ops(&self) -> bool {
        false
    }

    /// Upserts a single task by ID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotImplemented`] unless [`Self::supports_row_ops`].
    fn save_one(&self, _task: &Task) -> Result<()> {
        Err(Error::NotImplemented("save_one".to_string()))
    }

    /// Removes a single task by exact ID, reporting whether a row existed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotImplemented`] unless [`Self::supports_row_ops`].
    fn delete_one(&self, _id: &TaskId) -> Result<bool> {
        Err(Error::NotImplemented("delete_one".to_string()))
    }

    /// Releases backend resources. Idempotent, safe at process shutdown.
    fn close(&self) -> Result<()> {
        Ok(())
    }
}
