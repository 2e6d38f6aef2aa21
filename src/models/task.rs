//! Task types and identifiers.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Syntactic pattern for due dates.
///
/// Calendar correctness is not checked; `2025-02-30` passes. The zero-padded
/// ISO form keeps lexicographic comparison equivalent to date comparison.
#[allow(clippy::unwrap_used)] // pattern is a compile-time constant
static DUE_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

/// Checks that a due date is syntactically `YYYY-MM-DD`.
#[must_use]
pub fn is_valid_due_date(s: &str) -> bool {
    DUE_DATE_RE.is_match(s)
}

/// Unique identifier for a task.
///
/// Generated once at creation and immutable afterwards. Callers may address
/// tasks by a leading prefix of the identifier (see
/// [`TaskId::matches_prefix`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Creates a task ID from an existing string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh unique task ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this ID starts with the given prefix.
    ///
    /// Ambiguity is the caller's concern: a prefix shared by several IDs
    /// matches each of them.
    #[must_use]
    pub fn matches_prefix(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }

    /// Returns a short display form of the ID (first 8 characters).
    #[must_use]
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(8)
            .map_or(self.0.len(), |(i, _)| i);
        &self.0[..end]
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Task priority levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Low priority.
    Low,
    /// Medium priority (default).
    #[default]
    Medium,
    /// High priority.
    High,
}

impl Priority {
    /// Returns all priority variants.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Low, Self::Medium, Self::High]
    }

    /// Returns the priority as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Sort rank: high sorts before medium sorts before low.
    #[must_use]
    pub const fn rank(&self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }

    /// Parses a priority from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Not yet started (initial state).
    #[default]
    Pending,
    /// Being worked on.
    InProgress,
    /// Finished.
    Completed,
}

impl Status {
    /// Returns all status variants.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Pending, Self::InProgress, Self::Completed]
    }

    /// Returns the status as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    /// Parses a status from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "in_progress" | "in-progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A tracked task.
///
/// Field names serialize in camelCase to match the snapshot document schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier, immutable after creation.
    pub id: TaskId,
    /// Short description of the work. Never empty.
    pub title: String,
    /// Optional longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Priority level.
    #[serde(default)]
    pub priority: Priority,
    /// Optional free-form category. Compared case-insensitively.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Optional due date in `YYYY-MM-DD` form. No timezone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    /// Current lifecycle status.
    #[serde(default)]
    pub status: Status,
    /// Creation timestamp, set once.
    pub created_at: DateTime<Utc>,
    /// Completion timestamp. Present iff `status` is completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Creates a new pending task with a fresh ID, stamped now.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: TaskId::generate(),
            title: title.into(),
            description: None,
            priority: Priority::default(),
            category: None,
            due_date: None,
            status: Status::default(),
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Returns true if the task's category equals `category`, ignoring case.
    #[must_use]
    pub fn category_matches(&self, category: &str) -> bool {
        self.category
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case(category))
    }
}

/// The full set of tasks plus the most recent persist stamp.
///
/// Loaded whole at the start of every operation and persisted at the end.
/// There is no cross-operation cache, so edits made directly to the
/// underlying store are picked up on the next operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCollection {
    /// All tasks, in insertion order.
    pub tasks: Vec<Task>,
    /// Timestamp of the most recent persist.
    pub last_updated: DateTime<Utc>,
}

impl TaskCollection {
    /// Creates an empty collection stamped now.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            tasks: Vec::new(),
            last_updated: Utc::now(),
        }
    }

    /// Finds the first task whose ID starts with `prefix`, in collection order.
    ///
    /// An ambiguous prefix silently resolves to the first match.
    #[must_use]
    pub fn find_by_prefix(&self, prefix: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id.matches_prefix(prefix))
    }

    /// Mutable variant of [`Self::find_by_prefix`].
    #[must_use]
    pub fn find_by_prefix_mut(&mut self, prefix: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id.matches_prefix(prefix))
    }
}

impl Default for TaskCollection {
    fn default() -> Self {
        Self::empty()
    }
}
