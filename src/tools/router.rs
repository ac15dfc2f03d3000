//! Name-to-tool dispatch with a uniform request/response envelope.
//!
//! Every front end goes through [`ToolRouter::dispatch`], so validation and
//! error mapping are identical no matter where a request came from.

use super::{AddTask, CheckReminders, CompleteTask, DeleteTask, DynTool, ListTasks};
use crate::datetime::DisplayTimezone;
use crate::error::{ErrorCode, TaskError};
use crate::store::TaskStore;
use rmcp::model::Tool as ToolDefinition;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

/// Incoming tool invocation. `id` is caller-supplied and echoed back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRequest {
    pub id: String,
    pub tool: String,
    #[serde(default)]
    pub payload: Value,
}

impl ToolRequest {
    pub fn new(id: impl Into<String>, tool: impl Into<String>, payload: Value) -> Self {
        Self {
            id: id.into(),
            tool: tool.into(),
            payload,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Outgoing envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub id: String,
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
}

impl ToolResponse {
    pub fn success(id: impl Into<String>, result: Value) -> Self {
        Self {
            id: id.into(),
            status: ResponseStatus::Success,
            result: Some(result),
            error: None,
            code: None,
        }
    }

    pub fn failure(id: impl Into<String>, err: &TaskError) -> Self {
        Self {
            id: id.into(),
            status: ResponseStatus::Error,
            result: None,
            error: Some(err.message.clone()),
            code: Some(err.code),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}

/// Immutable name-to-tool table, built once at startup.
pub struct ToolRouter {
    tools: HashMap<&'static str, Box<dyn DynTool>>,
    /// Registration order, for stable listings.
    order: Vec<&'static str>,
}

impl ToolRouter {
    /// Build a router from `tools`. If two share a name the first wins.
    pub fn new(tools: Vec<Box<dyn DynTool>>) -> Self {
        let mut map: HashMap<&'static str, Box<dyn DynTool>> = HashMap::new();
        let mut order = Vec::with_capacity(tools.len());
        for tool in tools {
            let name = tool.name();
            if map.contains_key(name) {
                warn!(tool = name, "Duplicate tool registration ignored");
                continue;
            }
            order.push(name);
            map.insert(name, tool);
        }
        Self { tools: map, order }
    }

    /// The five task tools sharing one store.
    pub fn standard(store: Arc<TaskStore>, timezone: DisplayTimezone) -> Self {
        let tools: Vec<Box<dyn DynTool>> = vec![
            Box::new(AddTask::new(Arc::clone(&store), timezone)),
            Box::new(ListTasks::new(Arc::clone(&store))),
            Box::new(CompleteTask::new(Arc::clone(&store))),
            Box::new(DeleteTask::new(Arc::clone(&store))),
            Box::new(CheckReminders::new(store)),
        ];
        Self::new(tools)
    }

    pub fn tool_names(&self) -> &[&'static str] {
        &self.order
    }

    /// Tool descriptors in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.definition())
            .collect()
    }

    /// Resolve and run `request.tool`. Never fails: every error, including
    /// a panic inside a tool, comes back as an error envelope.
    pub fn dispatch(&self, request: ToolRequest) -> ToolResponse {
        let started = Instant::now();
        let ToolRequest { id, tool, payload } = request;

        let Some(handler) = self.tools.get(tool.as_str()) else {
            let err = TaskError::unknown_tool(&tool);
            warn!(tool = %tool, request_id = %id, "Unknown tool");
            return ToolResponse::failure(id, &err);
        };

        let outcome = catch_unwind(AssertUnwindSafe(|| handler.invoke(&payload)))
            .unwrap_or_else(|panic| {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "tool panicked".to_string());
                error!(tool = %tool, request_id = %id, reason = %reason, "Tool panicked");
                Err(TaskError::internal(reason))
            });

        let duration_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(result) => {
                debug!(tool = %tool, request_id = %id, duration_ms, "Tool call succeeded");
                ToolResponse::success(id, result)
            }
            Err(err) => {
                warn!(
                    tool = %tool,
                    request_id = %id,
                    error_code = %err.code,
                    error_message = %err.message,
                    duration_ms,
                    "Tool call failed"
                );
                ToolResponse::failure(id, &err)
            }
        }
    }
}

impl std::fmt::Debug for ToolRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRouter")
            .field("tools", &self.order)
            .finish()
    }
}
