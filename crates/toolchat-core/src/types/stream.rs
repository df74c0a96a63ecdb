//! Streaming types: backend fragments in, turn events out

use serde::{Deserialize, Serialize};

/// One incremental unit of a model turn, as produced by a provider.
///
/// Tool calls are not delimited explicitly: a new `CallId` is the only
/// boundary between consecutive calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Fragment {
    /// Assistant text
    Content(String),
    /// Start of a new tool call
    CallId(String),
    /// Name of the currently open tool call
    Name(String),
    /// Next piece of the open call's JSON arguments
    ArgsDelta(String),
}

impl Fragment {
    /// Create a content fragment
    pub fn content(text: impl Into<String>) -> Self {
        Fragment::Content(text.into())
    }

    /// Create a call-id fragment
    pub fn call_id(id: impl Into<String>) -> Self {
        Fragment::CallId(id.into())
    }

    /// Create a name fragment
    pub fn name(name: impl Into<String>) -> Self {
        Fragment::Name(name.into())
    }

    /// Create an argument fragment
    pub fn args_delta(delta: impl Into<String>) -> Self {
        Fragment::ArgsDelta(delta.into())
    }
}

/// Event delivered to a sink while a conversation runs.
///
/// Serialized with a `type` tag so a web layer can frame each event as one
/// SSE `data:` line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// Assistant text, forwarded as soon as it arrives
    TextFragment { text: String },
    /// A tool call is about to run
    ToolCallStarted { name: String, arguments: String },
    /// A tool call finished (successfully or not)
    ToolResult {
        name: String,
        content: String,
        #[serde(rename = "isError", default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
    /// The exchange failed and has ended
    Error { message: String },
    /// The exchange completed
    Done,
}

impl TurnEvent {
    /// Create a text event
    pub fn text(text: impl Into<String>) -> Self {
        TurnEvent::TextFragment { text: text.into() }
    }

    /// Create an error event
    pub fn error(message: impl Into<String>) -> Self {
        TurnEvent::Error {
            message: message.into(),
        }
    }

    /// Whether this event ends the event stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnEvent::Error { .. } | TurnEvent::Done)
    }

    /// Get the text if this is a text event
    pub fn as_text(&self) -> Option<&str> {
        match self {
            TurnEvent::TextFragment { text } => Some(text),
            _ => None,
        }
    }
}
