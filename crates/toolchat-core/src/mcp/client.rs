//! MCP tool connection using the official rmcp SDK
//!
//! Spawns a tool server as a child process and talks to it over stdio.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use rmcp::{
    model::{
        CallToolRequestParams, CallToolResult, ClientCapabilities, ClientInfo, Implementation,
        RawContent, Tool,
    },
    service::RunningService,
    transport::TokioChildProcess,
    RoleClient, ServiceExt,
};
use serde_json::Value;
use tokio::process::Command;
use tokio::sync::Mutex;

use crate::config::ServerConfig;
use crate::log_debug;
use crate::logging::Logger;
use crate::tools::{Liveness, ServerTool, ToolConnection, ToolError, ToolOutput, ToolsResult};

type McpService = RunningService<RoleClient, ClientInfo>;

/// Connection to one MCP server running as a child process.
///
/// The running service is owned by the connection: dropping it cancels the
/// rmcp service and the child is killed on drop, so the process never
/// outlives the connection even if `close()` is never reached.
pub struct McpConnection {
    server_id: String,
    config: ServerConfig,
    liveness: RwLock<Liveness>,
    /// Filled by the first successful connect, never modified afterwards
    tools: OnceCell<Vec<ServerTool>>,
    /// Doubles as the per-connection call lock
    service: Mutex<Option<McpService>>,
    logger: Arc<dyn Logger>,
}

impl McpConnection {
    /// Create an unconnected handle for a configured server
    pub fn new(server_id: impl Into<String>, config: ServerConfig, logger: Arc<dyn Logger>) -> Self {
        Self {
            server_id: server_id.into(),
            config,
            liveness: RwLock::new(Liveness::Disconnected),
            tools: OnceCell::new(),
            service: Mutex::new(None),
            logger,
        }
    }

    /// The configuration this connection was created from
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    fn client_info() -> ClientInfo {
        ClientInfo {
            meta: None,
            protocol_version: Default::default(),
            capabilities: ClientCapabilities::default(),
            client_info: Implementation {
                name: "toolchat-core".to_string(),
                title: Some("toolchat".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                website_url: None,
                icons: None,
            },
        }
    }

    /// Spawn the process, run `initialize`, then fetch the tool list
    async fn start(&self) -> ToolsResult<(McpService, Vec<ServerTool>)> {
        let mut command = Command::new(&self.config.command);
        command
            .args(&self.config.args)
            .envs(&self.config.env)
            .kill_on_drop(true);

        let transport = TokioChildProcess::new(command)
            .map_err(|e| ToolError::connection(&self.server_id, format!("spawn failed: {}", e)))?;

        let service = Self::client_info()
            .serve(transport)
            .await
            .map_err(|e| ToolError::connection(&self.server_id, format!("initialize failed: {}", e)))?;

        if let Some(info) = service.peer_info() {
            self.logger.debug(&format!(
                "[McpConnection] '{}' is {} {}",
                self.server_id, info.server_info.name, info.server_info.version
            ));
        }

        let tools = service
            .list_all_tools()
            .await
            .map_err(|e| ToolError::connection(&self.server_id, format!("tools/list failed: {}", e)))?;

        Ok((service, tools.into_iter().map(server_tool).collect()))
    }

    fn set_liveness(&self, liveness: Liveness) {
        *self.liveness.write() = liveness;
    }
}

#[async_trait]
impl ToolConnection for McpConnection {
    fn server_id(&self) -> &str {
        &self.server_id
    }

    fn liveness(&self) -> Liveness {
        *self.liveness.read()
    }

    async fn connect(&self) -> ToolsResult<()> {
        let mut slot = self.service.lock().await;
        if slot.is_some() {
            return Ok(());
        }

        self.logger.info(&format!(
            "[McpConnection] Starting '{}': {} {}",
            self.server_id,
            self.config.command,
            self.config.args.join(" ")
        ));

        let timeout = self.config.connect_timeout();
        let started = match tokio::time::timeout(timeout, self.start()).await {
            Ok(result) => result,
            Err(_) => Err(ToolError::connection(
                &self.server_id,
                format!("handshake timed out after {}s", timeout.as_secs()),
            )),
        };

        match started {
            Ok((service, tools)) => {
                self.logger.info(&format!(
                    "[McpConnection] '{}' connected with {} tools",
                    self.server_id,
                    tools.len()
                ));
                let _ = self.tools.set(tools);
                *slot = Some(service);
                self.set_liveness(Liveness::Connected);
                Ok(())
            }
            Err(e) => {
                self.set_liveness(Liveness::Failed);
                Err(e)
            }
        }
    }

    fn list_tools(&self) -> ToolsResult<Vec<ServerTool>> {
        match (self.liveness(), self.tools.get()) {
            (Liveness::Connected, Some(tools)) => Ok(tools.clone()),
            _ => Err(ToolError::NotConnected {
                server: self.server_id.clone(),
            }),
        }
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> ToolsResult<ToolOutput> {
        let slot = self.service.lock().await;
        let service = slot.as_ref().ok_or_else(|| ToolError::NotConnected {
            server: self.server_id.clone(),
        })?;

        log_debug!(self.logger, "[McpConnection] Calling '{}' on '{}'", name, self.server_id);

        let params = CallToolRequestParams {
            meta: None,
            name: name.to_owned().into(),
            arguments: arguments.as_object().cloned(),
            task: None,
        };

        let result = service
            .call_tool(params)
            .await
            .map_err(|e| ToolError::invocation(&self.server_id, name, e))?;

        let text = result_text(&result);
        if result.is_error.unwrap_or(false) {
            return Err(ToolError::invocation(&self.server_id, name, text));
        }

        let raw = serde_json::to_value(&result).unwrap_or(Value::Null);
        Ok(ToolOutput { text, raw })
    }

    async fn close(&self) -> ToolsResult<()> {
        let service = self.service.lock().await.take();
        if self.liveness() == Liveness::Connected {
            self.set_liveness(Liveness::Disconnected);
        }

        let Some(service) = service else {
            return Ok(());
        };

        self.logger.info(&format!("[McpConnection] Closing '{}'", self.server_id));
        service
            .cancel()
            .await
            .map(|_| ())
            .map_err(|e| ToolError::connection(&self.server_id, format!("shutdown failed: {}", e)))
    }
}

fn server_tool(tool: Tool) -> ServerTool {
    ServerTool {
        name: tool.name.to_string(),
        description: tool.description.map(|d| d.to_string()).unwrap_or_default(),
        input_schema: Value::Object((*tool.input_schema).clone()),
    }
}

/// Text blocks of a call result joined with newlines
fn result_text(result: &CallToolResult) -> String {
    result
        .content
        .iter()
        .filter_map(|c| match &c.raw {
            RawContent::Text(t) => Some(t.text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use std::time::Duration;

    fn connection(command: &str) -> McpConnection {
        let config = ServerConfig::new(command, Vec::<String>::new())
            .with_connect_timeout(Duration::from_secs(5));
        McpConnection::new("fs", config, Arc::new(NoOpLogger))
    }

    #[tokio::test]
    async fn test_unconnected_connection() {
        let conn = connection("definitely-not-a-real-mcp-server");
        assert_eq!(conn.liveness(), Liveness::Disconnected);
        assert!(matches!(
            conn.list_tools(),
            Err(ToolError::NotConnected { .. })
        ));
        assert!(matches!(
            conn.call_tool("read_file", serde_json::json!({})).await,
            Err(ToolError::NotConnected { .. })
        ));
        // Closing a connection that never started succeeds, twice.
        conn.close().await.unwrap();
        conn.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_spawn_failure_marks_failed() {
        let conn = connection("definitely-not-a-real-mcp-server");
        let err = conn.connect().await.unwrap_err();
        assert!(matches!(err, ToolError::Connection { ref server, .. } if server == "fs"));
        assert_eq!(conn.liveness(), Liveness::Failed);
        conn.close().await.unwrap();
        assert_eq!(conn.liveness(), Liveness::Failed);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_silent_server_times_out() {
        // `sleep` starts fine but never answers the initialize request.
        let config =
            ServerConfig::new("sleep", ["30"]).with_connect_timeout(Duration::from_secs(1));
        let conn = McpConnection::new("slow", config, Arc::new(NoOpLogger));

        let started = std::time::Instant::now();
        let err = conn.connect().await.unwrap_err();

        assert!(
            matches!(err, ToolError::Connection { ref server, ref message }
                if server == "slow" && message.contains("timed out")),
            "unexpected error: {:?}",
            err
        );
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(conn.liveness(), Liveness::Failed);
        assert!(matches!(conn.list_tools(), Err(ToolError::NotConnected { .. })));
        conn.close().await.unwrap();
    }
}
