//! The seam between the registry and a single tool server

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ToolsResult;

/// Connection state of one tool server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Liveness {
    Disconnected,
    Connected,
    Failed,
}

impl std::fmt::Display for Liveness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Liveness::Disconnected => write!(f, "disconnected"),
            Liveness::Connected => write!(f, "connected"),
            Liveness::Failed => write!(f, "failed"),
        }
    }
}

/// A tool as reported by its own server (unqualified name)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerTool {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl ServerTool {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// Result payload of a successful tool call
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    /// Text content blocks joined with newlines
    pub text: String,
    /// The complete result as returned by the server
    pub raw: Value,
}

impl ToolOutput {
    /// Output made of a single text block
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        let raw = serde_json::json!({ "content": [{ "type": "text", "text": text }] });
        Self { text, raw }
    }
}

/// One tool server's lifetime and catalog/invocation surface.
///
/// Implementations must be safe to call from several sessions at once; a
/// transport without concurrent in-flight calls serializes them internally.
#[async_trait]
pub trait ToolConnection: Send + Sync {
    /// Identifier of the server, used as the tool-name prefix
    fn server_id(&self) -> &str;

    /// Current connection state
    fn liveness(&self) -> Liveness;

    /// Start the server, run the handshake and cache its tool list
    async fn connect(&self) -> ToolsResult<()>;

    /// Tool list cached by `connect()`
    fn list_tools(&self) -> ToolsResult<Vec<ServerTool>>;

    /// Call a tool by its unqualified name
    async fn call_tool(&self, name: &str, arguments: Value) -> ToolsResult<ToolOutput>;

    /// Release the transport and the server process; idempotent
    async fn close(&self) -> ToolsResult<()>;
}
