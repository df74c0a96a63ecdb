//! In-process tool connection for testing
//!
//! Behaves like a real server (connect, list, call, close) without spawning
//! anything. Each tool is a closure over its JSON arguments.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};

use super::connection::{Liveness, ServerTool, ToolConnection, ToolOutput};
use super::error::{ToolError, ToolsResult};

type Handler = Arc<dyn Fn(Value) -> Result<String, String> + Send + Sync>;

struct MockTool {
    tool: ServerTool,
    handler: Handler,
}

/// Scripted tool server
pub struct MockConnection {
    server_id: String,
    tools: Vec<MockTool>,
    connect_error: Option<String>,
    close_error: Option<String>,
    delay: Option<Duration>,
    liveness: RwLock<Liveness>,
    calls: Mutex<Vec<(String, Value)>>,
    connect_attempts: AtomicUsize,
    close_count: AtomicUsize,
}

impl MockConnection {
    /// Create a server with no tools
    pub fn new(server_id: impl Into<String>) -> Self {
        Self {
            server_id: server_id.into(),
            tools: Vec::new(),
            connect_error: None,
            close_error: None,
            delay: None,
            liveness: RwLock::new(Liveness::Disconnected),
            calls: Mutex::new(Vec::new()),
            connect_attempts: AtomicUsize::new(0),
            close_count: AtomicUsize::new(0),
        }
    }

    /// Add a tool backed by `handler`; an `Err` becomes an invocation failure
    pub fn with_tool<F>(mut self, name: impl Into<String>, description: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Value) -> Result<String, String> + Send + Sync + 'static,
    {
        self.tools.push(MockTool {
            tool: ServerTool::new(name, description, json!({ "type": "object" })),
            handler: Arc::new(handler),
        });
        self
    }

    /// Add a tool that answers with its own arguments
    pub fn with_echo_tool(self, name: impl Into<String>) -> Self {
        let name = name.into();
        let description = format!("Echoes the arguments of {}", name);
        self.with_tool(name, description, |args| Ok(args.to_string()))
    }

    /// Make `connect()` fail with `message`
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.connect_error = Some(message.into());
        self
    }

    /// Make `close()` fail with `message`
    pub fn failing_close(mut self, message: impl Into<String>) -> Self {
        self.close_error = Some(message.into());
        self
    }

    /// Sleep before answering each call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Calls received so far, as (unqualified name, arguments)
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().clone()
    }

    pub fn connect_attempts(&self) -> usize {
        self.connect_attempts.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }

    fn not_connected(&self) -> ToolError {
        ToolError::NotConnected {
            server: self.server_id.clone(),
        }
    }
}

#[async_trait]
impl ToolConnection for MockConnection {
    fn server_id(&self) -> &str {
        &self.server_id
    }

    fn liveness(&self) -> Liveness {
        *self.liveness.read()
    }

    async fn connect(&self) -> ToolsResult<()> {
        self.connect_attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.connect_error {
            *self.liveness.write() = Liveness::Failed;
            return Err(ToolError::connection(&self.server_id, message));
        }
        *self.liveness.write() = Liveness::Connected;
        Ok(())
    }

    fn list_tools(&self) -> ToolsResult<Vec<ServerTool>> {
        if self.liveness() != Liveness::Connected {
            return Err(self.not_connected());
        }
        Ok(self.tools.iter().map(|t| t.tool.clone()).collect())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> ToolsResult<ToolOutput> {
        if self.liveness() != Liveness::Connected {
            return Err(self.not_connected());
        }
        self.calls.lock().push((name.to_string(), arguments.clone()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let tool = self
            .tools
            .iter()
            .find(|t| t.tool.name == name)
            .ok_or_else(|| ToolError::invocation(&self.server_id, name, "no such tool"))?;

        (tool.handler)(arguments)
            .map(ToolOutput::text)
            .map_err(|message| ToolError::invocation(&self.server_id, name, message))
    }

    async fn close(&self) -> ToolsResult<()> {
        self.close_count.fetch_add(1, Ordering::SeqCst);
        {
            let mut liveness = self.liveness.write();
            if *liveness == Liveness::Connected {
                *liveness = Liveness::Disconnected;
            }
        }
        match &self.close_error {
            Some(message) => Err(ToolError::connection(&self.server_id, message)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_lifecycle() {
        let conn = MockConnection::new("clock").with_tool("now", "Current time", |_| {
            Ok("2024-01-01T00:00:00Z".to_string())
        });

        assert!(conn.list_tools().is_err());
        conn.connect().await.unwrap();
        assert_eq!(conn.list_tools().unwrap().len(), 1);

        let output = conn.call_tool("now", json!({})).await.unwrap();
        assert_eq!(output.text, "2024-01-01T00:00:00Z");
        assert_eq!(output.raw["content"][0]["type"], "text");
        assert_eq!(conn.calls(), vec![("now".to_string(), json!({}))]);

        conn.close().await.unwrap();
        assert_eq!(conn.liveness(), Liveness::Disconnected);
        assert!(conn.call_tool("now", json!({})).await.is_err());
    }
}
