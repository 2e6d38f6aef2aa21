//! MCP tool implementations.
//!
//! Provides the eight task tool handlers for the Model Context Protocol.
//! The tool layer owns argument parsing and string-to-enum conversion;
//! violations are reported back as tool results, never as transport
//! failures. Unknown tool names are the one hard error, surfaced to the
//! JSON-RPC layer.

use crate::models::{Priority, Status};
use crate::rendering;
use crate::service::{CreateTask, ListFilter, TaskPatch, TaskService};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of MCP tools.
pub struct ToolRegistry {
    /// Available tools.
    tools: HashMap<String, ToolDefinition>,
    /// The task operation layer.
    service: Arc<TaskService>,
}

impl ToolRegistry {
    /// Creates a tool registry over the given service.
    #[must_use]
    pub fn new(service: Arc<TaskService>) -> Self {
        let mut tools = HashMap::new();

        tools.insert(
            "task_create".to_string(),
            ToolDefinition {
                name: "task_create".to_string(),
                description: "Create a new task".to_string(),
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "title": {
                            "type": "string",
                            "minLength": 1,
                            "description": "Short description of the work"
                        },
                        "description": {
                            "type": "string",
                            "description": "Optional longer description"
                        },
                        "priority": {
                            "type": "string",
                            "description": "Priority level (default: medium)",
                            "enum": ["low", "medium", "high"]
                        },
                        "category": {
                            "type": "string",
                            "description": "Optional free-form category"
                        },
                        "dueDate": {
                            "type": "string",
                            "description": "Optional due date in YYYY-MM-DD form",
                            "pattern": "^\\d{4}-\\d{2}-\\d{2}$"
                        }
                    },
                    "required": ["title"]
                }),
            },
        );

        tools.insert(
            "task_list".to_string(),
            ToolDefinition {
                name: "task_list".to_string(),
                description: "List tasks, optionally filtered by status, priority, or category"
                    .to_string(),
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "status": {
                            "type": "string",
                            "description": "Filter by status ('all' skips the filter)",
                            "enum": ["all", "pending", "in_progress", "completed"]
                        },
                        "priority": {
                            "type": "string",
                            "description": "Filter by priority ('all' skips the filter)",
                            "enum": ["all", "low", "medium", "high"]
                        },
                        "category": {
                            "type": "string",
                            "description": "Filter by category (case-insensitive exact match)"
                        }
                    },
                    "required": []
                }),
            },
        );

        tools.insert(
            "task_update".to_string(),
            ToolDefinition {
                name: "task_update".to_string(),
                description: "Update fields of an existing task by ID prefix".to_string(),
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "taskId": {
                            "type": "string",
                            "minLength": 8,
                            "description": "Task ID or a prefix of at least 8 characters"
                        },
                        "title": { "type": "string", "minLength": 1 },
                        "description": { "type": "string" },
                        "priority": {
                            "type": "string",
                            "enum": ["low", "medium", "high"]
                        },
                        "category": { "type": "string" },
                        "dueDate": {
                            "type": "string",
                            "pattern": "^\\d{4}-\\d{2}-\\d{2}$"
                        },
                        "status": {
                            "type": "string",
                            "enum": ["pending", "in_progress", "completed"]
                        }
                    },
                    "required": ["taskId"]
                }),
            },
        );

        tools.insert(
            "task_delete".to_string(),
            ToolDefinition {
                name: "task_delete".to_string(),
                description: "Delete a task by ID prefix".to_string(),
                input_schema: task_id_schema(),
            },
        );

        tools.insert(
            "task_complete".to_string(),
            ToolDefinition {
                name: "task_complete".to_string(),
                description: "Mark a task as completed by ID prefix".to_string(),
                input_schema: task_id_schema(),
            },
        );

        tools.insert(
            "task_search".to_string(),
            ToolDefinition {
                name: "task_search".to_string(),
                description: "Search tasks by substring over title and description".to_string(),
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "minLength": 1,
                            "description": "Case-insensitive search text"
                        }
                    },
                    "required": ["query"]
                }),
            },
        );

        tools.insert(
            "task_stats".to_string(),
            ToolDefinition {
                name: "task_stats".to_string(),
                description: "Show aggregate task statistics".to_string(),
                input_schema: empty_schema(),
            },
        );

        tools.insert(
            "task_clear_completed".to_string(),
            ToolDefinition {
                name: "task_clear_completed".to_string(),
                description: "Remove every completed task".to_string(),
                input_schema: empty_schema(),
            },
        );

        Self { tools, service }
    }

    /// Returns all tool definitions.
    #[must_use]
    pub fn list_tools(&self) -> Vec<&ToolDefinition> {
        self.tools.values().collect()
    }

    /// Gets a tool definition by name.
    #[must_use]
    pub fn get_tool(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    /// Executes a tool with the given arguments.
    ///
    /// Operation-level failures (validation, not-found, backend errors) are
    /// reported inside the returned [`ToolResult`].
    ///
    /// # Errors
    ///
    /// Returns an error only for an unknown tool name.
    pub fn execute(&self, name: &str, arguments: Value) -> Result<ToolResult> {
        match name {
            "task_create" => Ok(self.execute_create(arguments)),
            "task_list" => Ok(self.execute_list(arguments)),
            "task_update" => Ok(self.execute_update(arguments)),
            "task_delete" => Ok(self.execute_delete(arguments)),
            "task_complete" => Ok(self.execute_complete(arguments)),
            "task_search" => Ok(self.execute_search(arguments)),
            "task_stats" => Ok(self.execute_stats(&arguments)),
            "task_clear_completed" => Ok(self.execute_clear_completed(&arguments)),
            _ => Err(Error::InvalidInput(format!("Unknown tool: {name}"))),
        }
    }

    /// Executes the create tool.
    fn execute_create(&self, arguments: Value) -> ToolResult {
        let args: CreateArgs = match parse_args(arguments) {
            Ok(args) => args,
            Err(result) => return result,
        };

        let mut issues = Vec::new();
        let priority = parse_priority_arg(args.priority.as_deref(), &mut issues);
        if !issues.is_empty() {
            return validation_result(&issues);
        }

        let request = CreateTask {
            title: args.title,
            description: args.description,
            priority,
            category: args.category,
            due_date: args.due_date,
        };

        match self.service.create(request) {
            Ok(task) => ToolResult::text(rendering::render_created(&task)),
            Err(e) => error_result(&e),
        }
    }

    /// Executes the list tool.
    fn execute_list(&self, arguments: Value) -> ToolResult {
        let args: ListArgs = match parse_args(arguments) {
            Ok(args) => args,
            Err(result) => return result,
        };

        let mut issues = Vec::new();
        let status = match args.status.as_deref() {
            None | Some("all") => None,
            Some(s) => {
                let parsed = Status::parse(s);
                if parsed.is_none() {
                    issues.push(status_issue(s));
                }
                parsed
            },
        };
        let priority = match args.priority.as_deref() {
            None | Some("all") => None,
            Some(s) => parse_priority_arg(Some(s), &mut issues),
        };
        if !issues.is_empty() {
            return validation_result(&issues);
        }

        let filter = ListFilter {
            status,
            priority,
            category: args.category,
        };

        match self.service.list(&filter) {
            Ok(report) => ToolResult::text(rendering::render_list(&report)),
            Err(e) => error_result(&e),
        }
    }

    /// Executes the update tool.
    fn execute_update(&self, arguments: Value) -> ToolResult {
        let args: UpdateArgs = match parse_args(arguments) {
            Ok(args) => args,
            Err(result) => return result,
        };

        let mut issues = Vec::new();
        let priority = parse_priority_arg(args.priority.as_deref(), &mut issues);
        let status = match args.status.as_deref() {
            None => None,
            Some(s) => {
                let parsed = Status::parse(s);
                if parsed.is_none() {
                    issues.push(status_issue(s));
                }
                parsed
            },
        };
        if !issues.is_empty() {
            return validation_result(&issues);
        }

        let patch = TaskPatch {
            title: args.title,
            description: args.description,
            priority,
            category: args.category,
            due_date: args.due_date,
            status,
        };

        match self.service.update(&args.task_id, patch) {
            Ok(Some(task)) => ToolResult::text(rendering::render_updated(&task)),
            Ok(None) => ToolResult::text(rendering::render_not_found(&args.task_id)),
            Err(e) => error_result(&e),
        }
    }

    /// Executes the delete tool.
    fn execute_delete(&self, arguments: Value) -> ToolResult {
        let args: TaskIdArgs = match parse_args(arguments) {
            Ok(args) => args,
            Err(result) => return result,
        };

        match self.service.delete(&args.task_id) {
            Ok(Some(task)) => ToolResult::text(rendering::render_deleted(&task)),
            Ok(None) => ToolResult::text(rendering::render_not_found(&args.task_id)),
            Err(e) => error_result(&e),
        }
    }

    /// Executes the complete tool.
    fn execute_complete(&self, arguments: Value) -> ToolResult {
        let args: TaskIdArgs = match parse_args(arguments) {
            Ok(args) => args,
            Err(result) => return result,
        };

        match self.service.complete(&args.task_id) {
            Ok(Some(task)) => ToolResult::text(rendering::render_completed(&task)),
            Ok(None) => ToolResult::text(rendering::render_not_found(&args.task_id)),
            Err(e) => error_result(&e),
        }
    }

    /// Executes the search tool.
    fn execute_search(&self, arguments: Value) -> ToolResult {
        let args: SearchArgs = match parse_args(arguments) {
            Ok(args) => args,
            Err(result) => return result,
        };

        match self.service.search(&args.query) {
            Ok(tasks) => ToolResult::text(rendering::render_search(&args.query, &tasks)),
            Err(e) => error_result(&e),
        }
    }

    /// Executes the stats tool.
    fn execute_stats(&self, _arguments: &Value) -> ToolResult {
        match self.service.stats() {
            Ok(stats) => ToolResult::text(rendering::render_stats(&stats)),
            Err(e) => error_result(&e),
        }
    }

    /// Executes the clear-completed tool.
    fn execute_clear_completed(&self, _arguments: &Value) -> ToolResult {
        match self.service.clear_completed() {
            Ok(report) => ToolResult::text(rendering::render_cleared(&report)),
            Err(e) => error_result(&e),
        }
    }
}

/// Definition of an MCP tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// Tool description.
    pub description: String,
    /// JSON Schema for input validation.
    pub input_schema: Value,
}

/// Result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
    /// Whether the result represents an error.
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResult {
    /// Builds a successful single-text result.
    #[must_use]
    pub fn text(text: String) -> Self {
        Self {
            content: vec![ToolContent::Text { text }],
            is_error: false,
        }
    }

    /// Builds an error single-text result.
    #[must_use]
    pub fn error(text: String) -> Self {
        Self {
            content: vec![ToolContent::Text { text }],
            is_error: true,
        }
    }

    /// Returns the first text block, if any.
    #[must_use]
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|c| match c {
            ToolContent::Text { text } => Some(text.as_str()),
        })
    }
}

/// Content types that can be returned by tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// Arguments for the create tool.
#[derive(Debug, Deserialize)]
struct CreateArgs {
    title: String,
    description: Option<String>,
    priority: Option<String>,
    category: Option<String>,
    #[serde(rename = "dueDate")]
    due_date: Option<String>,
}

/// Arguments for the list tool.
#[derive(Debug, Deserialize)]
struct ListArgs {
    status: Option<String>,
    priority: Option<String>,
    category: Option<String>,
}

/// Arguments for the update tool.
#[derive(Debug, Deserialize)]
struct UpdateArgs {
    #[serde(rename = "taskId")]
    task_id: String,
    title: Option<String>,
    description: Option<String>,
    priority: Option<String>,
    category: Option<String>,
    #[serde(rename = "dueDate")]
    due_date: Option<String>,
    status: Option<String>,
}

/// Arguments for tools addressing a task by ID prefix.
#[derive(Debug, Deserialize)]
struct TaskIdArgs {
    #[serde(rename = "taskId")]
    task_id: String,
}

/// Arguments for the search tool.
#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
}

/// Schema shared by tools that address a task by ID prefix.
fn task_id_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "taskId": {
                "type": "string",
                "minLength": 8,
                "description": "Task ID or a prefix of at least 8 characters"
            }
        },
        "required": ["taskId"]
    })
}

/// Schema for tools taking no arguments.
fn empty_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {},
        "required": []
    })
}

/// Deserializes tool arguments, mapping failures to a validation result.
fn parse_args<T: serde::de::DeserializeOwned>(
    arguments: Value,
) -> std::result::Result<T, ToolResult> {
    serde_json::from_value(arguments)
        .map_err(|e| ToolResult::error(format!("Validation error: invalid arguments: {e}")))
}

/// Parses an optional priority argument, recording a violation on failure.
fn parse_priority_arg(s: Option<&str>, issues: &mut Vec<String>) -> Option<Priority> {
    let s = s?;
    let parsed = Priority::parse(s);
    if parsed.is_none() {
        issues.push(format!("priority must be one of low, medium, high; got '{s}'"));
    }
    parsed
}

/// Violation text for an unparseable status argument.
fn status_issue(s: &str) -> String {
    format!("status must be one of pending, in_progress, completed; got '{s}'")
}

/// Builds a validation-error tool result enumerating every violation.
fn validation_result(issues: &[String]) -> ToolResult {
    ToolResult::error(format!("Validation error: {}", issues.join("; ")))
}

/// Maps an operation error to a prefixed tool result.
fn error_result(e: &Error) -> ToolResult {
    match e {
        Error::Validation { issues } => validation_result(issues),
        other => ToolResult::error(format!("Error: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::TaskService;
    use crate::storage::SqliteBackend;

    fn registry() -> ToolRegistry {
        let service = TaskService::new(Box::new(SqliteBackend::in_memory().unwrap()));
        ToolRegistry::new(Arc::new(service))
    }

    #[test]
    fn test_registry_contains_all_task_tools() {
        let registry = registry();

        assert!(registry.get_tool("task_create").is_some());
        assert!(registry.get_tool("task_list").is_some());
        assert!(registry.get_tool("task_update").is_some());
        assert!(registry.get_tool("task_delete").is_some());
        assert!(registry.get_tool("task_complete").is_some());
        assert!(registry.get_tool("task_search").is_some());
        assert!(registry.get_tool("task_stats").is_some());
        assert!(registry.get_tool("task_clear_completed").is_some());
        assert_eq!(registry.list_tools().len(), 8);
    }

    #[test]
    fn test_unknown_tool_is_a_hard_error() {
        let registry = registry();
        let result = registry.execute("task_explode", serde_json::json!({}));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_create_then_list() {
        let registry = registry();

        let created = registry
            .execute(
                "task_create",
                serde_json::json!({ "title": "Review PRs", "priority": "high" }),
            )
            .unwrap();
        assert!(!created.is_error);
        assert!(created.first_text().unwrap().contains("Task created"));

        let listed = registry
            .execute("task_list", serde_json::json!({}))
            .unwrap();
        assert!(listed.first_text().unwrap().contains("Review PRs"));
        assert!(listed.first_text().unwrap().contains("Summary: 1 pending"));
    }

    #[test]
    fn test_create_rejects_unknown_priority() {
        let registry = registry();
        let result = registry
            .execute(
                "task_create",
                serde_json::json!({ "title": "t", "priority": "urgent" }),
            )
            .unwrap();

        assert!(result.is_error);
        let text = result.first_text().unwrap();
        assert!(text.starts_with("Validation error:"));
        assert!(text.contains("urgent"));
    }

    #[test]
    fn test_missing_required_argument_is_a_validation_result() {
        let registry = registry();
        let result = registry
            .execute("task_create", serde_json::json!({}))
            .unwrap();
        assert!(result.is_error);
        assert!(
            result
                .first_text()
                .unwrap()
                .starts_with("Validation error:")
        );
    }

    #[test]
    fn test_not_found_is_not_an_error_result() {
        let registry = registry();
        let result = registry
            .execute(
                "task_complete",
                serde_json::json!({ "taskId": "deadbeef" }),
            )
            .unwrap();

        assert!(!result.is_error);
        assert!(result.first_text().unwrap().starts_with("Not found:"));
    }

    #[test]
    fn test_list_all_skips_filters() {
        let registry = registry();
        registry
            .execute("task_create", serde_json::json!({ "title": "t" }))
            .unwrap();

        let result = registry
            .execute(
                "task_list",
                serde_json::json!({ "status": "all", "priority": "all" }),
            )
            .unwrap();
        assert!(!result.is_error);
        assert!(result.first_text().unwrap().contains("[ ] "));
    }

    #[test]
    fn test_stats_on_empty_collection() {
        let registry = registry();
        let result = registry
            .execute("task_stats", serde_json::json!({}))
            .unwrap();
        assert!(result.first_text().unwrap().starts_with("No tasks yet"));
    }

    #[test]
    fn test_clear_completed_flow() {
        let registry = registry();
        let created = registry
            .execute("task_create", serde_json::json!({ "title": "done soon" }))
            .unwrap();
        // Pull the short ID out of the rendered header line
        let text = created.first_text().unwrap();
        let prefix = text
            .lines()
            .find(|l| l.starts_with("[ ] "))
            .and_then(|l| l.split_whitespace().nth(2))
            .unwrap()
            .to_string();

        registry
            .execute("task_complete", serde_json::json!({ "taskId": prefix }))
            .unwrap();

        let cleared = registry
            .execute("task_clear_completed", serde_json::json!({}))
            .unwrap();
        assert!(
            cleared
                .first_text()
                .unwrap()
                .contains("Cleared 1 completed task(s). 0 active task(s) remaining.")
        );

        let again = registry
            .execute("task_clear_completed", serde_json::json!({}))
            .unwrap();
        assert_eq!(
            again.first_text().unwrap(),
            "No completed tasks to clear."
        );
    }
}
