//! MCP resource handlers.
//!
//! Exposes the read-only listing surface: the full task collection as JSON
//! text under the `taskdeck://tasks` URI, for inspection by external
//! tooling without going through the tool operations.

use crate::service::TaskService;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// URI of the full-collection listing resource.
const TASKS_URI: &str = "taskdeck://tasks";

/// Handler for MCP resources.
pub struct ResourceHandler {
    /// The task operation layer.
    service: Arc<TaskService>,
}

impl ResourceHandler {
    /// Creates a resource handler over the given service.
    #[must_use]
    pub const fn new(service: Arc<TaskService>) -> Self {
        Self { service }
    }

    /// Lists all available resources.
    #[must_use]
    pub fn list_resources(&self) -> Vec<ResourceDefinition> {
        vec![ResourceDefinition {
            uri: TASKS_URI.to_string(),
            name: "All tasks".to_string(),
            description: Some("The full task collection as JSON".to_string()),
            mime_type: Some("application/json".to_string()),
        }]
    }

    /// Gets a resource by URI.
    ///
    /// # Errors
    ///
    /// Returns an error if the URI is unknown or the collection cannot be
    /// loaded or serialized.
    pub fn get_resource(&self, uri: &str) -> Result<ResourceContent> {
        let uri = uri.trim();

        if uri != TASKS_URI {
            return Err(Error::InvalidInput(format!("Unknown resource URI: {uri}")));
        }

        let collection = self.service.load_collection()?;
        let json =
            serde_json::to_string_pretty(&collection).map_err(|e| Error::OperationFailed {
                operation: "serialize_collection".to_string(),
                cause: e.to_string(),
            })?;

        Ok(ResourceContent {
            uri: uri.to_string(),
            mime_type: Some("application/json".to_string()),
            text: Some(json),
        })
    }
}

/// Definition of an MCP resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDefinition {
    /// Resource URI.
    pub uri: String,
    /// Human-readable name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// MIME type of the content.
    pub mime_type: Option<String>,
}

/// Content of a resource read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceContent {
    /// Resource URI.
    pub uri: String,
    /// MIME type of the content.
    pub mime_type: Option<String>,
    /// Text content.
    pub text: Option<String>,
}
