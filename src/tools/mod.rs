//! Tool implementations and the capability they share.
//!
//! A tool is `validate(payload) -> Args` followed by `handle(Args) -> Value`.
//! Validation failures never reach the store.

pub mod reminders;
pub mod router;
pub mod tasks;

pub use reminders::CheckReminders;
pub use router::{ResponseStatus, ToolRequest, ToolResponse, ToolRouter};
pub use tasks::{AddTask, CompleteTask, DeleteTask, ListTasks};

use crate::error::{TaskError, TaskResult};
use rmcp::model::Tool as ToolDefinition;
use serde_json::{Map, Value};

/// A named, validated operation.
pub trait Tool: Send + Sync {
    /// Normalized arguments produced by [`Tool::validate`].
    type Args;

    /// Wire name used for dispatch.
    const NAME: &'static str;

    /// One-line description for tool listings.
    const DESCRIPTION: &'static str;

    /// JSON schema `properties` object and required keys.
    fn input_schema(&self) -> (Value, Vec<&'static str>);

    fn validate(&self, payload: &Value) -> TaskResult<Self::Args>;

    fn handle(&self, args: Self::Args) -> TaskResult<Value>;
}

/// Object-safe view of a [`Tool`], as stored in the router.
pub trait DynTool: Send + Sync {
    fn name(&self) -> &'static str;

    fn definition(&self) -> ToolDefinition;

    fn invoke(&self, payload: &Value) -> TaskResult<Value>;
}

impl<T: Tool> DynTool for T {
    fn name(&self) -> &'static str {
        T::NAME
    }

    fn definition(&self) -> ToolDefinition {
        let (properties, required) = self.input_schema();
        make_tool(T::NAME, T::DESCRIPTION, properties, required)
    }

    fn invoke(&self, payload: &Value) -> TaskResult<Value> {
        let args = self.validate(payload)?;
        self.handle(args)
    }
}

/// Helper to create a tool definition.
pub fn make_tool(name: &str, description: &str, properties: Value, required: Vec<&str>) -> ToolDefinition {
    let input_schema = rmcp::model::JsonObject::from_iter([
        ("type".to_string(), serde_json::json!("object")),
        ("properties".to_string(), properties),
        ("required".to_string(), serde_json::json!(required)),
    ]);

    ToolDefinition::new(name.to_string(), description.to_string(), input_schema)
}

/// Payload as an object. `null` counts as `{}`.
pub fn payload_object(payload: &Value) -> TaskResult<Map<String, Value>> {
    match payload {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map.clone()),
        other => Err(TaskError::validation(format!(
            "Payload must be a JSON object, got {}",
            json_type_name(other)
        ))),
    }
}

/// Optional string field. Present-but-not-a-string is an error; `null` is absent.
pub fn get_string(args: &Map<String, Value>, key: &str) -> TaskResult<Option<String>> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(TaskError::invalid_value(
            key,
            format!("{} must be a string, got {}", key, json_type_name(other)),
        )),
    }
}

/// Required, non-blank string field, trimmed.
pub fn require_string(args: &Map<String, Value>, key: &str) -> TaskResult<String> {
    get_string(args, key)?
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| TaskError::missing_field(key))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;

    #[test]
    fn null_payload_is_empty_object() {
        assert!(payload_object(&Value::Null).unwrap().is_empty());
    }

    #[test]
    fn non_object_payload_is_rejected() {
        let err = payload_object(&json!([1, 2])).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(err.message.contains("array"));
    }

    #[test]
    fn require_string_rejects_blank_and_wrong_type() {
        let args = payload_object(&json!({"a": "  ", "b": 3, "c": " x "})).unwrap();
        assert_eq!(require_string(&args, "a").unwrap_err().field.as_deref(), Some("a"));
        assert_eq!(require_string(&args, "b").unwrap_err().code, ErrorCode::ValidationError);
        assert_eq!(require_string(&args, "c").unwrap(), "x");
        assert!(require_string(&args, "missing").is_err());
    }
}
