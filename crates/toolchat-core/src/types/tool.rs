//! Tool/function calling types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool as advertised to the model.
///
/// `qualified_name` is `<server_id>_<original_name>` and is unique across
/// every connected server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Globally unique, server-prefixed name
    #[serde(rename = "name")]
    pub qualified_name: String,
    /// Description of what the tool does
    pub description: String,
    /// JSON Schema for the input parameters
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
    /// Identifier of the server that owns the tool
    #[serde(rename = "serverId")]
    pub server_id: String,
    /// Name of the tool on its own server
    #[serde(rename = "originalName")]
    pub original_name: String,
}

/// A tool call requested by the model.
///
/// `arguments` is kept as the raw text the model streamed; it is parsed only
/// when the call is executed so a bad payload fails that one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this tool call
    pub id: String,
    /// Qualified name of the tool being called
    pub name: String,
    /// Raw JSON argument text, concatenated in arrival order
    pub arguments: String,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Parse the argument text into a JSON object
    pub fn parse_arguments(&self, policy: EmptyArgumentsPolicy) -> Result<Value, String> {
        let text = self.arguments.trim();
        if text.is_empty() {
            return match policy {
                EmptyArgumentsPolicy::EmptyObject => Ok(Value::Object(Default::default())),
                EmptyArgumentsPolicy::Reject => Err("no arguments were provided".to_string()),
            };
        }

        match serde_json::from_str::<Value>(text) {
            Ok(value @ Value::Object(_)) => Ok(value),
            Ok(other) => Err(format!("arguments must be a JSON object, got {}", json_kind(&other))),
            Err(e) => Err(format!("arguments are not valid JSON: {}", e)),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// What to do with a tool call whose argument text is empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyArgumentsPolicy {
    /// Treat the call as having no arguments (`{}`)
    #[default]
    EmptyObject,
    /// Fail the call as malformed
    Reject,
}

/// Outcome of one executed tool call, as appended to the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// ID of the tool call this is responding to
    #[serde(rename = "callId")]
    pub call_id: String,
    /// Qualified name of the tool that ran
    pub name: String,
    /// The result content, or the error text
    pub content: String,
    /// Whether this result represents an error
    #[serde(rename = "isError", default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolResult {
    /// Create a successful tool result
    pub fn success(call: &ToolCall, content: impl Into<String>) -> Self {
        Self {
            call_id: call.id.clone(),
            name: call.name.clone(),
            content: content.into(),
            is_error: false,
        }
    }

    /// Create an error tool result
    pub fn error(call: &ToolCall, error: impl Into<String>) -> Self {
        Self {
            call_id: call.id.clone(),
            name: call.name.clone(),
            content: error.into(),
            is_error: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_object_arguments() {
        let call = ToolCall::new("c1", "fs_list_dir", r#"{"path":"/tmp"}"#);
        let args = call.parse_arguments(EmptyArgumentsPolicy::default()).unwrap();
        assert_eq!(args, json!({"path": "/tmp"}));
    }

    #[test]
    fn test_empty_arguments_policy() {
        let call = ToolCall::new("c1", "clock_now", "  ");
        assert_eq!(
            call.parse_arguments(EmptyArgumentsPolicy::EmptyObject).unwrap(),
            json!({})
        );
        assert!(call.parse_arguments(EmptyArgumentsPolicy::Reject).is_err());
    }

    #[test]
    fn test_invalid_arguments() {
        let truncated = ToolCall::new("c1", "fs_read", r#"{"path":"/tm"#);
        let err = truncated
            .parse_arguments(EmptyArgumentsPolicy::EmptyObject)
            .unwrap_err();
        assert!(err.contains("not valid JSON"));

        let array = ToolCall::new("c2", "fs_read", "[1, 2]");
        let err = array
            .parse_arguments(EmptyArgumentsPolicy::EmptyObject)
            .unwrap_err();
        assert!(err.contains("an array"));
    }

    #[test]
    fn test_tool_result() {
        let call = ToolCall::new("call_123", "weather_get", "{}");
        let success = ToolResult::success(&call, "72F, sunny");
        assert!(!success.is_error);
        assert_eq!(success.call_id, "call_123");

        let error = ToolResult::error(&call, "Location not found");
        assert!(error.is_error);
        assert_eq!(error.name, "weather_get");
    }

    #[test]
    fn test_descriptor_serializes_qualified_name() {
        let descriptor = ToolDescriptor {
            qualified_name: "fs_read_file".to_string(),
            description: "Read a file".to_string(),
            input_schema: json!({"type": "object"}),
            server_id: "fs".to_string(),
            original_name: "read_file".to_string(),
        };
        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["name"], "fs_read_file");
        assert_eq!(json["originalName"], "read_file");
    }
}
