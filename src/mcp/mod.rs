//! MCP server implementation.
//!
//! Provides a Model Context Protocol server for AI agent interoperability.
//!
//! ## Features
//!
//! - **Tools**: `task_create`, `task_list`, `task_update`, `task_delete`,
//!   `task_complete`, `task_search`, `task_stats`, `task_clear_completed`
//! - **Resources**: the full collection as JSON via `taskdeck://tasks`
//!
//! ## Usage
//!
//! ### Stdio Transport (Claude Desktop)
//!
//! ```bash
//! taskdeck serve
//! ```
//!
//! ### Claude Desktop Configuration
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "taskdeck": {
//!       "command": "taskdeck",
//!       "args": ["serve"]
//!     }
//!   }
//! }
//! ```

mod dispatch;
mod resources;
mod server;
mod tools;

pub use dispatch::McpMethod;
pub use resources::{ResourceContent, ResourceDefinition, ResourceHandler};
pub use server::McpServer;
pub use tools::{ToolContent, ToolDefinition, ToolRegistry, ToolResult};
