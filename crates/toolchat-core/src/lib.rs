//! toolchat Core
//!
//! Streaming tool-call orchestration: a model streams its reply, tool calls
//! are rebuilt from the stream, routed to the MCP server that owns them, and
//! their results fed back until the model answers without tools.
//!
//! ## Components
//!
//! - `stream`: rebuilds tool calls from interleaved response fragments
//! - `tools`: one connection per tool server, joined by the `ToolRegistry`
//! - `mcp`: MCP servers spawned as child processes (official rmcp SDK)
//! - `providers`: model backends (genai, plus a scripted mock)
//! - `chat`: the per-conversation turn loop, event sinks, and chat storage
//!
//! ```rust,ignore
//! use toolchat_core::chat::{ChatSession, CollectingSink};
//! use toolchat_core::tools::ToolRegistry;
//!
//! let registry = Arc::new(ToolRegistry::from_config(&ServersConfig::load(path)?, logger.clone()));
//! let report = registry.connect_all().await;
//!
//! let mut chat = ChatSession::new(provider, registry.clone(), SessionConfig::default(), logger);
//! let mut sink = CollectingSink::new();
//! let answer = chat.send("What is in /tmp?", &mut sink).await?;
//!
//! registry.close_all().await?;
//! ```

pub mod types;
pub mod logging;
pub mod config;
pub mod providers;
pub mod stream;
pub mod tools;
pub mod mcp;
pub mod chat;

// Re-export commonly used types
pub use types::{
    CancellationToken, ChatMessage, EmptyArgumentsPolicy, Fragment, MessageRole, ToolCall,
    ToolDescriptor, ToolResult, TurnEvent,
};

pub use logging::{Logger, NoOpLogger, TracingLogger};

pub use config::{ConfigError, ServerConfig, ServersConfig, SessionConfig};

pub use providers::{create_provider, GenaiProvider, MockProvider, Provider, ProviderError};

pub use stream::{DecodedEvent, StreamDecoder, StreamError, ToolCallAccumulator};

pub use tools::{qualify, ConnectReport, ToolConnection, ToolError, ToolRegistry};

pub use mcp::McpConnection;

pub use chat::{
    ChannelSink, ChatError, ChatRecord, ChatSession, ChatStore, CollectingSink, EventSink,
    FileChatStore, MemoryChatStore, TurnOutcome,
};
