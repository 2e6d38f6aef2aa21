//! Human-readable rendering of tasks and operation results.
//!
//! Pure functions from data to text: deterministic, no side effects, no
//! I/O. Decoration beyond plain text is left to callers; the MCP host
//! decides how (or whether) to embellish these strings.

use crate::models::{Priority, Status, Task};
use crate::service::{ClearReport, ListReport, StatusCounts, TaskStats};
use chrono::Local;
use std::fmt::Write as _;

/// Status marker shown at the head of a rendered task.
const fn status_marker(status: Status) -> &'static str {
    match status {
        Status::Pending => "[ ]",
        Status::InProgress => "[~]",
        Status::Completed => "[x]",
    }
}

/// Priority marker shown next to the priority value.
const fn priority_marker(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "[!]",
        Priority::Medium => "[=]",
        Priority::Low => "[-]",
    }
}

/// Renders one task as multi-line text.
///
/// Optional fields only produce lines when present.
#[must_use]
pub fn render_task(task: &Task) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{} {} {}",
        status_marker(task.status),
        task.id.short(),
        task.title
    );
    let _ = writeln!(
        out,
        "    Priority: {} {}",
        priority_marker(task.priority),
        task.priority
    );
    if let Some(description) = &task.description {
        let _ = writeln!(out, "    Description: {description}");
    }
    if let Some(category) = &task.category {
        let _ = writeln!(out, "    Category: {category}");
    }
    if let Some(due) = &task.due_date {
        let _ = writeln!(out, "    Due: {due}");
    }
    let _ = writeln!(out, "    Status: {}", task.status);
    let _ = writeln!(
        out,
        "    Created: {}",
        task.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
    );
    if let Some(completed) = &task.completed_at {
        let _ = writeln!(
            out,
            "    Completed: {}",
            completed.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        );
    }

    out
}

/// Renders the status summary line over an unfiltered collection.
#[must_use]
pub fn render_summary(counts: &StatusCounts) -> String {
    format!(
        "Summary: {} pending, {} in progress, {} completed",
        counts.pending, counts.in_progress, counts.completed
    )
}

/// Renders a create confirmation.
#[must_use]
pub fn render_created(task: &Task) -> String {
    format!("Task created:\n\n{}", render_task(task))
}

/// Renders an update confirmation.
#[must_use]
pub fn render_updated(task: &Task) -> String {
    format!("Task updated:\n\n{}", render_task(task))
}

/// Renders a completion confirmation.
#[must_use]
pub fn render_completed(task: &Task) -> String {
    format!("Task completed:\n\n{}", render_task(task))
}

/// Renders a delete confirmation naming the removed task.
#[must_use]
pub fn render_deleted(task: &Task) -> String {
    format!("Deleted task: \"{}\"", task.title)
}

/// Renders the not-found result for an ID prefix.
///
/// A normal result, distinct from a validation error.
#[must_use]
pub fn render_not_found(prefix: &str) -> String {
    format!("Not found: no task with an ID starting with '{prefix}'")
}

/// Renders a list report: each matching task plus the unfiltered summary.
#[must_use]
pub fn render_list(report: &ListReport) -> String {
    if report.tasks.is_empty() {
        return format!("No tasks found.\n\n{}", render_summary(&report.counts));
    }

    let body: Vec<String> = report.tasks.iter().map(render_task).collect();
    format!("{}\n{}", body.join("\n"), render_summary(&report.counts))
}

/// Renders search results, echoing the query on an empty result.
#[must_use]
pub fn render_search(query: &str, tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return format!("No tasks matched query '{query}'.");
    }

    let body: Vec<String> = tasks.iter().map(render_task).collect();
    format!(
        "Found {} task(s) matching '{query}':\n\n{}",
        tasks.len(),
        body.join("\n")
    )
}

/// Renders the statistics report.
#[must_use]
pub fn render_stats(stats: &TaskStats) -> String {
    if stats.total == 0 {
        return "No tasks yet. Create one to get started.".to_string();
    }

    let mut out = String::from("Task statistics:\n\n");
    let _ = writeln!(out, "Total: {}", stats.total);
    let _ = writeln!(out, "Completion rate: {:.1}%", stats.completion_rate);
    let _ = writeln!(
        out,
        "Status: {} pending, {} in progress, {} completed",
        stats.by_status.pending, stats.by_status.in_progress, stats.by_status.completed
    );
    let _ = writeln!(
        out,
        "Priority: {} high, {} medium, {} low",
        stats.by_priority.high, stats.by_priority.medium, stats.by_priority.low
    );
    if !stats.by_category.is_empty() {
        let _ = writeln!(out, "Categories:");
        for (category, count) in &stats.by_category {
            let _ = writeln!(out, "  {category}: {count}");
        }
    }
    let _ = writeln!(out, "Overdue: {}", stats.overdue);
    let _ = writeln!(out, "Due within 7 days: {}", stats.due_soon);

    out
}

/// Renders the clear-completed report.
#[must_use]
pub fn render_cleared(report: &ClearReport) -> String {
    if report.removed == 0 {
        return "No completed tasks to clear.".to_string();
    }

    format!(
        "Cleared {} completed task(s). {} active task(s) remaining.",
        report.removed, report.remaining
    )
}
