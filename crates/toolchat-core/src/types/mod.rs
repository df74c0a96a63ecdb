//! Core types for tool-calling conversations
//!
//! This module contains the shared types used by providers, the decoder,
//! the tool registry and chat sessions.

mod message;
mod tool;
mod stream;

pub use message::{ChatMessage, MessageRole};
pub use tool::{EmptyArgumentsPolicy, ToolCall, ToolDescriptor, ToolResult};
pub use stream::{Fragment, TurnEvent};
pub use tokio_util::sync::CancellationToken;
