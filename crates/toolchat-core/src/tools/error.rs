//! Tool connection and routing errors

use thiserror::Error;

/// Errors raised by tool connections and the registry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// The server could not be started or the handshake failed
    #[error("Failed to connect to server '{server}': {message}")]
    Connection { server: String, message: String },

    /// A connection method was used before `connect()` succeeded
    #[error("Server '{server}' is not connected")]
    NotConnected { server: String },

    /// A registry method was used before `connect_all()` completed
    #[error("Tool registry is not ready: connect_all() has not completed")]
    NotReady,

    /// No connected server provides this qualified name
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// The tool or its transport failed
    #[error("Tool '{tool}' on server '{server}' failed: {message}")]
    Invocation {
        server: String,
        tool: String,
        message: String,
    },

    /// The model's argument text could not be used
    #[error("Invalid arguments for tool '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },

    /// One or more servers failed to shut down cleanly
    #[error("Failed to close servers: {}", .failures.join("; "))]
    Close { failures: Vec<String> },
}

impl ToolError {
    pub fn connection(server: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Connection {
            server: server.into(),
            message: message.to_string(),
        }
    }

    pub fn invocation(
        server: impl Into<String>,
        tool: impl Into<String>,
        message: impl std::fmt::Display,
    ) -> Self {
        Self::Invocation {
            server: server.into(),
            tool: tool.into(),
            message: message.to_string(),
        }
    }
}

pub type ToolsResult<T> = Result<T, ToolError>;
