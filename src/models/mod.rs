//! Data models for taskdeck.
//!
//! This module contains all the core data structures used throughout the system.

mod task;

pub use task::{Priority, Status, Task, TaskCollection, TaskId, is_valid_due_date};
