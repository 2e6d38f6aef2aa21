//! # Taskdeck
//!
//! A task tracking backend for AI coding assistants.
//!
//! Taskdeck stores tasks behind a pluggable storage layer (a JSON snapshot
//! file or a `SQLite` row store) and exposes them to AI agents through an
//! MCP server over stdio.
//!
//! ## Features
//!
//! - Single-binary distribution with no external services
//! - Pluggable storage backends behind one contract
//! - Eight task operations: create, list, update, delete, complete,
//!   search, stats, clear-completed
//! - MCP server integration for AI agent interoperability
//!
//! ## Example
//!
//! ```rust,ignore
//! use taskdeck::{CreateTask, TaskService};
//!
//! let service = TaskService::from_config(&config)?;
//! let task = service.create(CreateTask {
//!     title: "Review open PRs".to_string(),
//!     ..Default::default()
//! })?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod mcp;
pub mod models;
pub mod observability;
pub mod rendering;
pub mod service;
pub mod storage;

// Re-exports for convenience
pub use config::{BackendKind, TaskdeckConfig};
pub use models::{Priority, Status, Task, TaskCollection, TaskId};
pub use service::{
    ClearReport, CreateTask, ListFilter, ListReport, PriorityCounts, StatusCounts, TaskPatch,
    TaskService, TaskStats,
};
pub use storage::{SnapshotBackend, SqliteBackend, StorageBackend};

/// Error type for taskdeck operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait implementations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `Validation` | Caller arguments violate field constraints (empty title, bad due date) |
/// | `InvalidInput` | Malformed JSON in tool handlers, unknown tool or resource names |
/// | `OperationFailed` | I/O errors, database queries fail, serialization fails |
/// | `NotImplemented` | Calling an optional capability the active backend lacks |
#[derive(Debug, ThisError)]
pub enum Error {
    /// One or more argument constraints were violated.
    ///
    /// Carries every violated constraint so callers can report them all at
    /// once instead of failing on the first.
    #[error("validation failed: {}", issues.join("; "))]
    Validation {
        /// Human-readable description of each violated constraint.
        issues: Vec<String>,
    },

    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - JSON deserialization fails in MCP tool handlers
    /// - An unknown tool name or resource URI is requested
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - `SQLite` database operations fail
    /// - Filesystem I/O errors occur
    /// - Snapshot serialization fails
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// Optional backend capability not implemented.
    ///
    /// Raised when a single-row operation is invoked on a backend that only
    /// supports whole-collection persistence. Callers probe
    /// [`StorageBackend::supports_row_ops`] before invoking these.
    #[error("not implemented: {0}")]
    NotImplemented(String),
}

impl Error {
    /// Builds a validation error from a list of violated constraints.
    #[must_use]
    pub fn validation(issues: Vec<String>) -> Self {
        Self::Validation { issues }
    }
}

/// Result type alias for taskdeck operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("test error".to_string());
        assert_eq!(err.to_string(), "invalid input: test error");

        let err = Error::OperationFailed {
            operation: "test".to_string(),
            cause: "failed".to_string(),
        };
        assert_eq!(err.to_string(), "operation 'test' failed: failed");

        let err = Error::validation(vec![
            "title must not be empty".to_string(),
            "dueDate must match YYYY-MM-DD".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "validation failed: title must not be empty; dueDate must match YYYY-MM-DD"
        );
    }
}
