//! MCP (Model Context Protocol) tool servers
//!
//! Uses the official rmcp SDK to start each configured server as a child
//! process and speak MCP over its stdio.
//!
//! # Example
//!
//! ```rust,ignore
//! use toolchat_core::config::ServerConfig;
//! use toolchat_core::mcp::McpConnection;
//! use toolchat_core::tools::ToolConnection;
//!
//! let config = ServerConfig::new("npx", ["-y", "@modelcontextprotocol/server-filesystem", "/tmp"]);
//! let conn = McpConnection::new("fs", config, logger);
//! conn.connect().await?;
//!
//! let tools = conn.list_tools()?;
//! let output = conn.call_tool("list_directory", json!({ "path": "/tmp" })).await?;
//! conn.close().await?;
//! ```

mod client;

pub use client::McpConnection;
