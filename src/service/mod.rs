//! Task operations.
//!
//! [`TaskService`] implements the eight task operations on top of the
//! storage layer. Every operation loads the full collection, mutates it in
//! memory, and persists it before returning; there is no cross-operation
//! cache, so external edits to the underlying store are picked up between
//! calls.
//!
//! Lookup by ID accepts a leading prefix of the identifier. An ambiguous
//! prefix resolves to the first match in collection order; the caller-facing
//! schema keeps prefixes to 8+ characters, which makes collisions unlikely
//! but not impossible.

use crate::config::TaskdeckConfig;
use crate::models::{
    Priority, Status, Task, TaskCollection, is_valid_due_date,
};
use crate::storage::{StorageBackend, create_backend};
use crate::{Error, Result};
use chrono::{Datelike, Duration, Local, NaiveDate, Utc};
use std::collections::BTreeMap;

/// Sort sentinel for tasks without a due date: sorts after any real date.
const DUE_DATE_SENTINEL: &str = "9999-99-99";

/// Arguments for creating a task.
#[derive(Debug, Clone, Default)]
pub struct CreateTask {
    /// Required, non-empty title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Priority; defaults to medium when absent.
    pub priority: Option<Priority>,
    /// Optional free-form category.
    pub category: Option<String>,
    /// Optional due date, `YYYY-MM-DD`.
    pub due_date: Option<String>,
}

/// Filter for the list operation. `None` fields skip that filter.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// Keep only tasks with this status.
    pub status: Option<Status>,
    /// Keep only tasks with this priority.
    pub priority: Option<Priority>,
    /// Keep only tasks whose category matches, ignoring case.
    pub category: Option<String>,
}

/// Partial update for a task. Absent fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New priority.
    pub priority: Option<Priority>,
    /// New category.
    pub category: Option<String>,
    /// New due date.
    pub due_date: Option<String>,
    /// New status. Setting this drives the `completed_at` transitions.
    pub status: Option<Status>,
}

/// Task counts per status over the unfiltered collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    /// Pending tasks.
    pub pending: usize,
    /// In-progress tasks.
    pub in_progress: usize,
    /// Completed tasks.
    pub completed: usize,
}

impl StatusCounts {
    fn tally(tasks: &[Task]) -> Self {
        let mut counts = Self::default();
        for task in tasks {
            match task.status {
                Status::Pending => counts.pending += 1,
                Status::InProgress => counts.in_progress += 1,
                Status::Completed => counts.completed += 1,
            }
        }
        counts
    }
}

/// Task counts per priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriorityCounts {
    /// Low-priority tasks.
    pub low: usize,
    /// Medium-priority tasks.
    pub medium: usize,
    /// High-priority tasks.
    pub high: usize,
}

/// Result of the list operation.
#[derive(Debug, Clone)]
pub struct ListReport {
    /// Matching tasks, sorted by priority rank then due date.
    pub tasks: Vec<Task>,
    /// Status counts over the entire unfiltered collection.
    pub counts: StatusCounts,
}

/// Aggregate statistics over the entire collection.
#[derive(Debug, Clone, Default)]
pub struct TaskStats {
    /// Total number of tasks.
    pub total: usize,
    /// Completed tasks as a percentage of the total (0 when empty).
    pub completion_rate: f64,
    /// Counts per status.
    pub by_status: StatusCounts,
    /// Counts per priority.
    pub by_priority: PriorityCounts,
    /// Counts per category, alphabetical, only categories with at least one task.
    pub by_category: Vec<(String, usize)>,
    /// Tasks not completed whose due date is strictly before today.
    pub overdue: usize,
    /// Tasks not completed due within today through today+7 days inclusive.
    pub due_soon: usize,
}

/// Result of the clear-completed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearReport {
    /// Number of completed tasks removed.
    pub removed: usize,
    /// Number of tasks remaining.
    pub remaining: usize,
}

/// The task operation layer.
///
/// Owns the active storage backend for the lifetime of the process. Each
/// operation owns the in-memory collection only for its own duration.
pub struct TaskService {
    backend: Box<dyn StorageBackend>,
}

impl TaskService {
    /// Creates a service over an already-built backend.
    #[must_use]
    pub fn new(backend: Box<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Creates a service over the backend selected by the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be initialized.
    pub fn from_config(config: &TaskdeckConfig) -> Result<Self> {
        Ok(Self::new(create_backend(config)?))
    }

    /// Short name of the active backend.
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Loads the full collection without mutating it.
    ///
    /// Backs the read-only listing surface and the status command.
    pub fn load_collection(&self) -> Result<TaskCollection> {
        self.backend.load()
    }

    /// Releases backend resources. Idempotent.
    pub fn close(&self) -> Result<()> {
        self.backend.close()
    }

    /// Creates a new pending task and persists it.
    pub fn create(&self, req: CreateTask) -> Result<Task> {
        let mut issues = Vec::new();
        if req.title.trim().is_empty() {
            issues.push("title must not be empty".to_string());
        }
        if let Some(due) = &req.due_date {
            if !is_valid_due_date(due) {
                issues.push(format!("dueDate must match YYYY-MM-DD, got '{due}'"));
            }
        }
        if !issues.is_empty() {
            return Err(Error::validation(issues));
        }

        let mut collection = self.backend.load()?;

        let mut task = Task::new(req.title);
        task.description = req.description;
        task.priority = req.priority.unwrap_or_default();
        task.category = req.category;
        task.due_date = req.due_date;

        collection.tasks.push(task.clone());
        self.backend.save_all(&mut collection)?;

        tracing::info!(task.id = %task.id, "Created task");
        Ok(task)
    }

    /// Lists tasks matching the filter, sorted, with unfiltered status counts.
    ///
    /// Sorting is by priority rank (high first), tie-broken by due date
    /// ascending; tasks without a due date sort last.
    pub fn list(&self, filter: &ListFilter) -> Result<ListReport> {
        let collection = self.backend.load()?;
        let counts = StatusCounts::tally(&collection.tasks);

        let mut tasks: Vec<Task> = collection
            .tasks
            .into_iter()
            .filter(|t| filter.status.is_none_or(|s| t.status == s))
            .filter(|t| filter.priority.is_none_or(|p| t.priority == p))
            .filter(|t| {
                filter
                    .category
                    .as_deref()
                    .is_none_or(|c| t.category_matches(c))
            })
            .collect();

        tasks.sort_by_key(|t| {
            (
                t.priority.rank(),
                t.due_date
                    .clone()
                    .unwrap_or_else(|| DUE_DATE_SENTINEL.to_string()),
            )
        });

        Ok(ListReport { tasks, counts })
    }

    /// Applies a partial update to the first task matching the ID prefix.
    ///
    /// Returns `Ok(None)` when no task matches; not-found is a normal
    /// result, not an error. Setting `status` to completed stamps
    /// `completed_at` only when it is not already set; setting any other
    /// status clears it unconditionally.
    pub fn update(&self, prefix: &str, patch: TaskPatch) -> Result<Option<Task>> {
        let mut issues = Vec::new();
        if prefix.is_empty() {
            issues.push("taskId must not be empty".to_string());
        }
        if let Some(title) = &patch.title {
            if title.trim().is_empty() {
                issues.push("title must not be empty".to_string());
            }
        }
        if let Some(due) = &patch.due_date {
            if !is_valid_due_date(due) {
                issues.push(format!("dueDate must match YYYY-MM-DD, got '{due}'"));
            }
        }
        if !issues.is_empty() {
            return Err(Error::validation(issues));
        }

        let mut collection = self.backend.load()?;
        let Some(task) = collection.find_by_prefix_mut(prefix) else {
            return Ok(None);
        };

        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(description) = patch.description {
            task.description = Some(description);
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(category) = patch.category {
            task.category = Some(category);
        }
        if let Some(due_date) = patch.due_date {
            task.due_date = Some(due_date);
        }
        if let Some(status) = patch.status {
            task.status = status;
            if status == Status::Completed {
                if task.completed_at.is_none() {
                    task.completed_at = Some(Utc::now());
                }
            } else {
                task.completed_at = None;
            }
        }

        let updated = task.clone();
        self.backend.save_all(&mut collection)?;

        tracing::info!(task.id = %updated.id, "Updated task");
        Ok(Some(updated))
    }

    /// Removes the first task matching the ID prefix.
    ///
    /// Returns the removed task, or `Ok(None)` when no task matches. Uses
    /// the backend's single-row delete where supported; the `SQLite`
    /// backend's `save_all` would leave the row behind otherwise.
    pub fn delete(&self, prefix: &str) -> Result<Option<Task>> {
        if prefix.is_empty() {
            return Err(Error::validation(vec![
                "taskId must not be empty".to_string(),
            ]));
        }

        let mut collection = self.backend.load()?;
        let Some(index) = collection
            .tasks
            .iter()
            .position(|t| t.id.matches_prefix(prefix))
        else {
            return Ok(None);
        };

        let removed = collection.tasks.remove(index);
        if self.backend.supports_row_ops() {
            self.backend.delete_one(&removed.id)?;
        } else {
            self.backend.save_all(&mut collection)?;
        }

        tracing::info!(task.id = %removed.id, "Deleted task");
        Ok(Some(removed))
    }

    /// Marks the first task matching the ID prefix as completed.
    ///
    /// Forces `completed_at` to now even when the task was already
    /// completed. Returns `Ok(None)` when no task matches.
    pub fn complete(&self, prefix: &str) -> Result<Option<Task>> {
        if prefix.is_empty() {
            return Err(Error::validation(vec![
                "taskId must not be empty".to_string(),
            ]));
        }

        let mut collection = self.backend.load()?;
        let Some(task) = collection.find_by_prefix_mut(prefix) else {
            return Ok(None);
        };

        task.status = Status::Completed;
        task.completed_at = Some(Utc::now());

        let completed = task.clone();
        self.backend.save_all(&mut collection)?;

        tracing::info!(task.id = %completed.id, "Completed task");
        Ok(Some(completed))
    }

    /// Case-insensitive substring search over title and description.
    ///
    /// Tasks without a description never match on that field. No result
    /// limit.
    pub fn search(&self, query: &str) -> Result<Vec<Task>> {
        let collection = self.backend.load()?;
        let needle = query.to_lowercase();

        Ok(collection
            .tasks
            .into_iter()
            .filter(|t| {
                t.title.to_lowercase().contains(&needle)
                    || t.description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            })
            .collect())
    }

    /// Computes aggregate statistics using the local calendar date.
    pub fn stats(&self) -> Result<TaskStats> {
        self.stats_as_of(Local::now().date_naive())
    }

    /// Computes aggregate statistics as of the given date.
    ///
    /// An empty collection short-circuits to an all-zero report.
    #[allow(clippy::cast_precision_loss)]
    pub fn stats_as_of(&self, today: NaiveDate) -> Result<TaskStats> {
        let collection = self.backend.load()?;
        let total = collection.tasks.len();
        if total == 0 {
            return Ok(TaskStats::default());
        }

        let by_status = StatusCounts::tally(&collection.tasks);

        let mut by_priority = PriorityCounts::default();
        for task in &collection.tasks {
            match task.priority {
                Priority::Low => by_priority.low += 1,
                Priority::Medium => by_priority.medium += 1,
                Priority::High => by_priority.high += 1,
            }
        }

        let mut categories: BTreeMap<String, usize> = BTreeMap::new();
        for task in &collection.tasks {
            if let Some(category) = &task.category {
                *categories.entry(category.clone()).or_insert(0) += 1;
            }
        }

        // Lexicographic comparison is date comparison for zero-padded ISO dates
        let today_str = format_date(today);
        let horizon_str = format_date(today + Duration::days(7));

        let mut overdue = 0;
        let mut due_soon = 0;
        for task in &collection.tasks {
            if task.status == Status::Completed {
                continue;
            }
            let Some(due) = task.due_date.as_deref() else {
                continue;
            };
            if due < today_str.as_str() {
                overdue += 1;
            } else if due <= horizon_str.as_str() {
                due_soon += 1;
            }
        }

        Ok(TaskStats {
            total,
            completion_rate: by_status.completed as f64 * 100.0 / total as f64,
            by_status,
            by_priority,
            by_category: categories.into_iter().collect(),
            overdue,
            due_soon,
        })
    }

    /// Removes every completed task and reports the counts.
    ///
    /// Nothing is persisted when there was nothing to clear.
    pub fn clear_completed(&self) -> Result<ClearReport> {
        let mut collection = self.backend.load()?;

        let cleared: Vec<Task> = collection
            .tasks
            .iter()
            .filter(|t| t.status == Status::Completed)
            .cloned()
            .collect();
        if cleared.is_empty() {
            return Ok(ClearReport {
                removed: 0,
                remaining: collection.tasks.len(),
            });
        }

        collection.tasks.retain(|t| t.status != Status::Completed);
        let remaining = collection.tasks.len();

        if self.backend.supports_row_ops() {
            for task in &cleared {
                self.backend.delete_one(&task.id)?;
            }
        } else {
            self.backend.save_all(&mut collection)?;
        }

        tracing::info!(removed = cleared.len(), remaining, "Cleared completed tasks");
        Ok(ClearReport {
            removed: cleared.len(),
            remaining,
        })
    }
}

/// Formats a date as zero-padded `YYYY-MM-DD`.
fn format_date(date: NaiveDate) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}
