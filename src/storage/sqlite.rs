//! `SQLite` row-store backend.
//!
//! Persists one row per task in a `tasks` table keyed by `id`, with
//! secondary indexes on `status`, `priority`, and `category` for filtered
//! reads.
//!
//! # Concurrency Model
//!
//! Uses a `Mutex<Connection>` for thread-safe access. WAL mode and the
//! `busy_timeout` pragma mitigate contention:
//!
//! - **WAL mode**: Allows concurrent readers with a single writer
//! - **`busy_timeout`**: Waits up to 5 seconds for locks instead of failing immediately
//! - **NORMAL synchronous**: Balances durability with performance
//!
//! # Divergence from the snapshot backend
//!
//! `save_all` upserts every task in the input collection inside one
//! transaction but does not delete rows absent from it. The snapshot
//! backend's full overwrite removes them implicitly. Backends are not meant
//! to be hot-swapped on a live, pre-populated store; delete paths use
//! [`StorageBackend::delete_one`] here.

use crate::models::{Priority, Status, Task, TaskCollection, TaskId};
use crate::storage::traits::StorageBackend;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Helper to acquire mutex lock with poison recovery.
///
/// If the mutex is poisoned (due to a panic in a previous critical section),
/// we recover the inner value and log a warning. This prevents cascading
/// failures when one operation panics.
fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("SQLite mutex was poisoned, recovering");
            metrics::counter!("sqlite_mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        },
    }
}

/// Configures a `SQLite` connection for performance and concurrency.
fn configure_connection(conn: &Connection) {
    // Note: pragma_update returns the result which we ignore - journal_mode
    // returns a string like "wal" which would cause execute_batch to fail
    let _ = conn.pragma_update(None, "journal_mode", "WAL");
    let _ = conn.pragma_update(None, "synchronous", "NORMAL");
    // Wait up to 5 seconds for locks instead of failing with SQLITE_BUSY
    let _ = conn.pragma_update(None, "busy_timeout", "5000");
}

/// SQLite-based row-store backend.
pub struct SqliteBackend {
    /// Connection to the `SQLite` database.
    ///
    /// Protected by Mutex because `rusqlite::Connection` is not `Sync`.
    conn: Mutex<Connection>,
    /// Path to the `SQLite` database (None for in-memory).
    db_path: Option<PathBuf>,
}

/// Row shape for the `tasks` table.
struct TaskRow {
    id: String,
    title: String,
    description: Option<String>,
    priority: String,
    category: Option<String>,
    due_date: Option<String>,
    status: String,
    created_at: String,
    completed_at: Option<String>,
}

impl From<&Task> for TaskRow {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.as_str().to_string(),
            title: task.title.clone(),
            description: task.description.clone(),
            priority: task.priority.as_str().to_string(),
            category: task.category.clone(),
            due_date: task.due_date.clone(),
            status: task.status.as_str().to_string(),
            created_at: task.created_at.to_rfc3339(),
            completed_at: task.completed_at.map(|t| t.to_rfc3339()),
        }
    }
}

impl TaskRow {
    fn into_task(self) -> Result<Task> {
        Ok(Task {
            id: TaskId::new(self.id),
            title: self.title,
            description: self.description,
            priority: Priority::parse(&self.priority).unwrap_or_default(),
            category: self.category,
            due_date: self.due_date,
            status: Status::parse(&self.status).unwrap_or_default(),
            created_at: parse_timestamp(&self.created_at)?,
            completed_at: self.completed_at.as_deref().map(parse_timestamp).transpose()?,
        })
    }
}

/// Parses an RFC 3339 timestamp column.
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::OperationFailed {
            operation: "parse_timestamp".to_string(),
            cause: format!("{s}: {e}"),
        })
}

impl SqliteBackend {
    /// Creates a new `SQLite` backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::OperationFailed {
                operation: "create_data_dir".to_string(),
                cause: e.to_string(),
            })?;
        }

        let conn = Connection::open(&db_path).map_err(|e| Error::OperationFailed {
            operation: "open_sqlite".to_string(),
            cause: e.to_string(),
        })?;

        let backend = Self {
            conn: Mutex::new(conn),
            db_path: Some(db_path),
        };

        backend.initialize()?;
        Ok(backend)
    }

    /// Creates an in-memory `SQLite` backend (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::OperationFailed {
            operation: "open_sqlite_memory".to_string(),
            cause: e.to_string(),
        })?;

        let backend = Self {
            conn: Mutex::new(conn),
            db_path: None,
        };

        backend.initialize()?;
        Ok(backend)
    }

    /// Returns the database path (None for in-memory).
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Initializes the database schema.
    fn initialize(&self) -> Result<()> {
        let conn = acquire_lock(&self.conn);

        configure_connection(&conn);

        conn.execute(
            "CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT,
                priority TEXT NOT NULL CHECK(priority IN ('low', 'medium', 'high')),
                category TEXT,
                due_date TEXT,
                status TEXT NOT NULL CHECK(status IN ('pending', 'in_progress', 'completed')),
                created_at TEXT NOT NULL,
                completed_at TEXT
            )",
            [],
        )
        .map_err(|e| Error::OperationFailed {
            operation: "create_tasks_table".to_string(),
            cause: e.to_string(),
        })?;

        Self::create_indexes(&conn);

        Ok(())
    }

    /// Creates indexes for the filtered read patterns of the list operation.
    fn create_indexes(conn: &Connection) {
        let _ = conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status)",
            [],
        );

        let _ = conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_tasks_priority ON tasks(priority)",
            [],
        );

        let _ = conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_tasks_category ON tasks(category)",
            [],
        );
    }

    /// Upserts one task on an already-locked connection.
    fn upsert_row(conn: &Connection, task: &Task) -> Result<()> {
        let row = TaskRow::from(task);
        conn.execute(
            "INSERT OR REPLACE INTO tasks
                (id, title, description, priority, category, due_date, status, created_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                row.id,
                row.title,
                row.description,
                row.priority,
                row.category,
                row.due_date,
                row.status,
                row.created_at,
                row.completed_at,
            ],
        )
        .map_err(|e| Error::OperationFailed {
            operation: "upsert_task".to_string(),
            cause: e.to_string(),
        })?;
        Ok(())
    }
}

impl StorageBackend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn load(&self) -> Result<TaskCollection> {
        let conn = acquire_lock(&self.conn);

        let mut stmt = conn
            .prepare(
                "SELECT id, title, description, priority, category, due_date, status,
                        created_at, completed_at
                 FROM tasks
                 ORDER BY created_at, id",
            )
            .map_err(|e| Error::OperationFailed {
                operation: "prepare_load".to_string(),
                cause: e.to_string(),
            })?;

        let rows = stmt
            .query_map([], |row| {
                Ok(TaskRow {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    description: row.get(2)?,
                    priority: row.get(3)?,
                    category: row.get(4)?,
                    due_date: row.get(5)?,
                    status: row.get(6)?,
                    created_at: row.get(7)?,
                    completed_at: row.get(8)?,
                })
            })
            .map_err(|e| Error::OperationFailed {
                operation: "query_tasks".to_string(),
                cause: e.to_string(),
            })?;

        let mut tasks = Vec::new();
        for row in rows {
            let row = row.map_err(|e| Error::OperationFailed {
                operation: "read_task_row".to_string(),
                cause: e.to_string(),
            })?;
            tasks.push(row.into_task()?);
        }

        Ok(TaskCollection {
            tasks,
            last_updated: Utc::now(),
        })
    }

    fn save_all(&self, collection: &mut TaskCollection) -> Result<()> {
        collection.last_updated = Utc::now();

        let conn = acquire_lock(&self.conn);

        // All-or-nothing upsert of the whole collection
        conn.execute("BEGIN IMMEDIATE", [])
            .map_err(|e| Error::OperationFailed {
                operation: "begin_transaction".to_string(),
                cause: e.to_string(),
            })?;

        let result = collection
            .tasks
            .iter()
            .try_for_each(|task| Self::upsert_row(&conn, task));

        if result.is_ok() {
            conn.execute("COMMIT", [])
                .map_err(|e| Error::OperationFailed {
                    operation: "commit_transaction".to_string(),
                    cause: e.to_string(),
                })?;
        } else {
            let _ = conn.execute("ROLLBACK", []);
        }

        result
    }

    fn supports_row_ops(&self) -> bool {
        true
    }

    fn save_one(&self, task: &Task) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        Self::upsert_row(&conn, task)
    }

    fn delete_one(&self, id: &TaskId) -> Result<bool> {
        let conn = acquire_lock(&self.conn);

        let affected = conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![id.as_str()])
            .map_err(|e| Error::OperationFailed {
                operation: "delete_task".to_string(),
                cause: e.to_string(),
            })?;

        Ok(affected > 0)
    }

    fn close(&self) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        // Checkpoint the WAL so the main database file is self-contained.
        // Harmless on repeat calls and on in-memory databases.
        let _ = conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task(title: &str) -> Task {
        Task::new(title)
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let backend = SqliteBackend::in_memory().unwrap();

        let mut collection = TaskCollection::empty();
        let mut task = sample_task("Fix flaky test");
        task.description = Some("See CI run 4821".to_string());
        task.priority = Priority::High;
        task.category = Some("ci".to_string());
        task.due_date = Some("2025-09-15".to_string());
        collection.tasks.push(task.clone());

        backend.save_all(&mut collection).unwrap();

        let loaded = backend.load().unwrap();
        assert_eq!(loaded.tasks.len(), 1);
        assert_eq!(loaded.tasks[0], task);
    }

    #[test]
    fn test_save_all_does_not_delete_missing_rows() {
        let backend = SqliteBackend::in_memory().unwrap();

        let mut collection = TaskCollection::empty();
        collection.tasks.push(sample_task("keep me"));
        collection.tasks.push(sample_task("also keep me"));
        backend.save_all(&mut collection).unwrap();

        // Dropping a task from the in-memory collection and saving again
        // leaves its row behind: save_all is upsert-only.
        collection.tasks.truncate(1);
        backend.save_all(&mut collection).unwrap();

        assert_eq!(backend.load().unwrap().tasks.len(), 2);
    }

    #[test]
    fn test_delete_one() {
        let backend = SqliteBackend::in_memory().unwrap();

        let task = sample_task("to delete");
        let mut collection = TaskCollection::empty();
        collection.tasks.push(task.clone());
        backend.save_all(&mut collection).unwrap();

        assert!(backend.delete_one(&task.id).unwrap());
        assert!(!backend.delete_one(&task.id).unwrap());
        assert!(backend.load().unwrap().tasks.is_empty());
    }

    #[test]
    fn test_save_one_upserts() {
        let backend = SqliteBackend::in_memory().unwrap();

        let mut task = sample_task("v1");
        backend.save_one(&task).unwrap();

        task.title = "v2".to_string();
        task.status = Status::Completed;
        task.completed_at = Some(Utc::now());
        backend.save_one(&task).unwrap();

        let loaded = backend.load().unwrap();
        assert_eq!(loaded.tasks.len(), 1);
        assert_eq!(loaded.tasks[0].title, "v2");
        assert_eq!(loaded.tasks[0].status, Status::Completed);
        assert!(loaded.tasks[0].completed_at.is_some());
    }

    #[test]
    fn test_row_ops_supported() {
        let backend = SqliteBackend::in_memory().unwrap();
        assert!(backend.supports_row_ops());
    }

    #[test]
    fn test_check_constraint_rejects_unknown_priority() {
        let backend = SqliteBackend::in_memory().unwrap();
        let conn = backend.conn.lock().unwrap();
        let result = conn.execute(
            "INSERT INTO tasks (id, title, priority, status, created_at)
             VALUES ('x', 't', 'urgent', 'pending', '2025-01-01T00:00:00Z')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_close_is_idempotent() {
        let backend = SqliteBackend::in_memory().unwrap();
        backend.close().unwrap();
        backend.close().unwrap();
    }

    #[test]
    fn test_load_orders_by_creation() {
        let backend = SqliteBackend::in_memory().unwrap();

        let mut first = sample_task("first");
        first.created_at = Utc::now() - chrono::Duration::seconds(10);
        let second = sample_task("second");

        // Insert newest first to prove ordering comes from the query
        backend.save_one(&second).unwrap();
        backend.save_one(&first).unwrap();

        let loaded = backend.load().unwrap();
        assert_eq!(loaded.tasks[0].title, "first");
        assert_eq!(loaded.tasks[1].title, "second");
    }
}
