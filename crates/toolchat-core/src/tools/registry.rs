//! Tool registry: owns every tool connection and routes calls between them
//!
//! The registry is the central component for:
//! - Connecting to every configured server, tolerating individual failures
//! - Presenting one catalog with server-prefixed, globally unique names
//! - Routing a qualified name back to its server and original name
//! - Executing tool calls from the model and converting the outcome

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use once_cell::sync::OnceCell;
use serde::Serialize;
use serde_json::Value;

use super::connection::{Liveness, ToolConnection, ToolOutput};
use super::error::{ToolError, ToolsResult};
use crate::config::ServersConfig;
use crate::log_warn;
use crate::logging::Logger;
use crate::mcp::McpConnection;
use crate::types::{EmptyArgumentsPolicy, ToolCall, ToolDescriptor, ToolResult};

/// Qualified name of `tool` on `server_id`
pub fn qualify(server_id: &str, tool: &str) -> String {
    format!("{}_{}", server_id, tool)
}

/// Outcome of `connect_all()`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectReport {
    /// Servers that connected, in registry order
    pub connected: Vec<String>,
    /// Servers that failed, with the reason
    pub failed: Vec<(String, String)>,
    /// Number of tools in the resulting catalog
    pub tool_count: usize,
}

impl ConnectReport {
    /// Whether every server connected
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

struct Route {
    connection: Arc<dyn ToolConnection>,
    original_name: String,
}

/// Immutable result of the connect pass
struct Catalog {
    tools: Vec<ToolDescriptor>,
    routes: HashMap<String, Route>,
    report: ConnectReport,
}

/// Registry of tool servers shared by every chat session.
///
/// The catalog is built once by `connect_all()` and is read-only afterwards,
/// so lookups take no lock.
pub struct ToolRegistry {
    connections: Vec<Arc<dyn ToolConnection>>,
    catalog: OnceCell<Catalog>,
    connect_lock: tokio::sync::Mutex<()>,
    logger: Arc<dyn Logger>,
}

impl ToolRegistry {
    /// Create a registry over already-constructed connections
    pub fn new(connections: Vec<Arc<dyn ToolConnection>>, logger: Arc<dyn Logger>) -> Self {
        Self {
            connections,
            catalog: OnceCell::new(),
            connect_lock: tokio::sync::Mutex::new(()),
            logger,
        }
    }

    /// Create a registry with one MCP connection per enabled server
    pub fn from_config(config: &ServersConfig, logger: Arc<dyn Logger>) -> Self {
        let connections = config
            .enabled_servers()
            .map(|(id, server)| {
                Arc::new(McpConnection::new(id, server.clone(), Arc::clone(&logger)))
                    as Arc<dyn ToolConnection>
            })
            .collect();
        Self::new(connections, logger)
    }

    /// Connect every server independently and build the catalog.
    ///
    /// A failing server is logged and left out; it never stops the others.
    /// Calling this again returns the first report without reconnecting.
    pub async fn connect_all(&self) -> ConnectReport {
        let _guard = self.connect_lock.lock().await;
        if let Some(catalog) = self.catalog.get() {
            return catalog.report.clone();
        }

        self.logger.info(&format!(
            "[ToolRegistry] Connecting {} servers",
            self.connections.len()
        ));

        let attempts = join_all(self.connections.iter().map(|conn| async move {
            let outcome = conn.connect().await;
            (Arc::clone(conn), outcome)
        }))
        .await;

        let mut tools = Vec::new();
        let mut routes = HashMap::new();
        let mut report = ConnectReport::default();

        for (conn, outcome) in attempts {
            let server_id = conn.server_id().to_string();
            let listed = outcome.and_then(|()| conn.list_tools());
            let server_tools = match listed {
                Ok(server_tools) => server_tools,
                Err(e) => {
                    log_warn!(self.logger, "[ToolRegistry] Server '{}' unavailable: {}", server_id, e);
                    report.failed.push((server_id, e.to_string()));
                    continue;
                }
            };

            for tool in server_tools {
                let qualified_name = qualify(&server_id, &tool.name);
                if routes.contains_key(&qualified_name) {
                    log_warn!(
                        self.logger,
                        "[ToolRegistry] Skipping '{}' from '{}': name already taken",
                        qualified_name,
                        server_id
                    );
                    continue;
                }

                routes.insert(
                    qualified_name.clone(),
                    Route {
                        connection: Arc::clone(&conn),
                        original_name: tool.name.clone(),
                    },
                );
                tools.push(ToolDescriptor {
                    qualified_name,
                    description: tool.description,
                    input_schema: tool.input_schema,
                    server_id: server_id.clone(),
                    original_name: tool.name,
                });
            }
            report.connected.push(server_id);
        }

        report.tool_count = tools.len();
        self.logger.info(&format!(
            "[ToolRegistry] Ready: {} tools from {} servers, {} failed",
            report.tool_count,
            report.connected.len(),
            report.failed.len()
        ));

        let catalog = Catalog {
            tools,
            routes,
            report: report.clone(),
        };
        // Only reachable once: the connect lock is held and the cell was empty.
        let _ = self.catalog.set(catalog);
        report
    }

    /// Whether `connect_all()` has completed
    pub fn is_ready(&self) -> bool {
        self.catalog.get().is_some()
    }

    fn catalog(&self) -> ToolsResult<&Catalog> {
        self.catalog.get().ok_or(ToolError::NotReady)
    }

    /// Every tool from every connected server, with qualified names
    pub fn list_all_tools(&self) -> ToolsResult<&[ToolDescriptor]> {
        Ok(&self.catalog()?.tools)
    }

    /// Server id and original name behind a qualified name
    pub fn resolve(&self, qualified_name: &str) -> ToolsResult<(&str, &str)> {
        let route = self
            .catalog()?
            .routes
            .get(qualified_name)
            .ok_or_else(|| ToolError::UnknownTool(qualified_name.to_string()))?;
        Ok((route.connection.server_id(), route.original_name.as_str()))
    }

    /// Call a tool by qualified name
    pub async fn call_tool(&self, qualified_name: &str, arguments: Value) -> ToolsResult<ToolOutput> {
        let route = self
            .catalog()?
            .routes
            .get(qualified_name)
            .ok_or_else(|| ToolError::UnknownTool(qualified_name.to_string()))?;

        self.logger.info(&format!(
            "[ToolRegistry] Calling '{}' on server '{}'",
            route.original_name,
            route.connection.server_id()
        ));

        route
            .connection
            .call_tool(&route.original_name, arguments)
            .await
    }

    /// Call several tools in order; one failure does not stop the rest
    pub async fn call_tools<I>(&self, batch: I) -> Vec<ToolsResult<ToolOutput>>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut results = Vec::new();
        for (name, arguments) in batch {
            results.push(self.call_tool(&name, arguments).await);
        }
        results
    }

    /// Execute a tool call from a model response.
    ///
    /// The raw argument text is parsed here, so a malformed payload only
    /// fails this call.
    pub async fn execute(&self, call: &ToolCall, policy: EmptyArgumentsPolicy) -> ToolResult {
        let outcome = match call.parse_arguments(policy) {
            Ok(arguments) => self.call_tool(&call.name, arguments).await,
            Err(message) => Err(ToolError::InvalidArguments {
                tool: call.name.clone(),
                message,
            }),
        };

        match outcome {
            Ok(output) => ToolResult::success(call, output.text),
            Err(e) => {
                log_warn!(self.logger, "[ToolRegistry] Tool call {} ({}) failed: {}", call.id, call.name, e);
                ToolResult::error(call, format!("Error: {}", e))
            }
        }
    }

    /// Execute tool calls sequentially, keeping their order
    pub async fn execute_tool_calls(
        &self,
        calls: &[ToolCall],
        policy: EmptyArgumentsPolicy,
    ) -> Vec<ToolResult> {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            results.push(self.execute(call, policy).await);
        }
        results
    }

    /// Close every connection, collecting failures instead of stopping at the first
    pub async fn close_all(&self) -> ToolsResult<()> {
        let outcomes = join_all(self.connections.iter().map(|conn| conn.close())).await;

        let failures: Vec<String> = outcomes
            .into_iter()
            .filter_map(Result::err)
            .map(|e| e.to_string())
            .collect();

        if failures.is_empty() {
            self.logger.info("[ToolRegistry] All servers closed");
            Ok(())
        } else {
            self.logger.error(&format!(
                "[ToolRegistry] {} servers failed to close",
                failures.len()
            ));
            Err(ToolError::Close { failures })
        }
    }

    /// Liveness of every owned connection, in registry order
    pub fn statuses(&self) -> Vec<(String, Liveness)> {
        self.connections
            .iter()
            .map(|c| (c.server_id().to_string(), c.liveness()))
            .collect()
    }

    /// Number of owned connections, connected or not
    pub fn server_count(&self) -> usize {
        self.connections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{LogLevel, MemoryLogger, NoOpLogger};
    use crate::tools::mock::MockConnection;
    use serde_json::json;

    fn registry(connections: Vec<MockConnection>) -> ToolRegistry {
        ToolRegistry::new(
            connections
                .into_iter()
                .map(|c| Arc::new(c) as Arc<dyn ToolConnection>)
                .collect(),
            Arc::new(NoOpLogger),
        )
    }

    fn server(id: &str, tools: &[&str]) -> MockConnection {
        tools
            .iter()
            .fold(MockConnection::new(id), |conn, tool| conn.with_echo_tool(*tool))
    }

    #[test]
    fn test_qualify() {
        assert_eq!(qualify("fs", "list_dir"), "fs_list_dir");
        assert_eq!(qualify("my_server", "read"), "my_server_read");
    }

    #[tokio::test]
    async fn test_not_ready_before_connect_all() {
        let registry = registry(vec![server("fs", &["read"])]);
        assert!(!registry.is_ready());
        assert_eq!(registry.list_all_tools().unwrap_err(), ToolError::NotReady);
        assert_eq!(
            registry.call_tool("fs_read", json!({})).await.unwrap_err(),
            ToolError::NotReady
        );
    }

    #[tokio::test]
    async fn test_resolve_reverses_qualified_names() {
        let registry = registry(vec![
            server("fs", &["list_dir", "read_file"]),
            server("my_search", &["query"]),
        ]);
        registry.connect_all().await;

        for (server_id, tool) in [("fs", "list_dir"), ("fs", "read_file"), ("my_search", "query")] {
            let qualified = qualify(server_id, tool);
            assert_eq!(registry.resolve(&qualified).unwrap(), (server_id, tool));
        }
        assert!(matches!(
            registry.resolve("fs_delete"),
            Err(ToolError::UnknownTool(_))
        ));
    }

    #[tokio::test]
    async fn test_same_tool_name_on_two_servers() {
        let registry = registry(vec![server("a", &["search"]), server("b", &["search"])]);
        registry.connect_all().await;

        let names: Vec<_> = registry
            .list_all_tools()
            .unwrap()
            .iter()
            .map(|t| t.qualified_name.as_str())
            .collect();
        assert_eq!(names, vec!["a_search", "b_search"]);
    }

    #[tokio::test]
    async fn test_partial_failure_tolerance() {
        let logger = Arc::new(MemoryLogger::new());
        let registry = ToolRegistry::new(
            vec![
                Arc::new(server("a", &["one"])) as Arc<dyn ToolConnection>,
                Arc::new(MockConnection::new("b").with_echo_tool("two").failing("spawn failed")),
                Arc::new(server("c", &["three"])),
            ],
            logger.clone(),
        );

        let report = registry.connect_all().await;
        assert_eq!(report.connected, vec!["a", "c"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "b");
        assert!(!report.is_complete());
        assert!(logger.contains(LogLevel::Warn, "'b' unavailable"));

        let names: Vec<_> = registry
            .list_all_tools()
            .unwrap()
            .iter()
            .map(|t| t.qualified_name.clone())
            .collect();
        assert_eq!(names, vec!["a_one", "c_three"]);

        assert!(registry.call_tool("a_one", json!({"x": 1})).await.is_ok());
        assert!(registry.call_tool("c_three", json!({})).await.is_ok());
        assert_eq!(
            registry.call_tool("b_two", json!({})).await.unwrap_err(),
            ToolError::UnknownTool("b_two".to_string())
        );
    }

    #[tokio::test]
    async fn test_connect_all_is_one_shot() {
        let a = Arc::new(server("a", &["one"]));
        let registry = ToolRegistry::new(vec![a.clone() as Arc<dyn ToolConnection>], Arc::new(NoOpLogger));

        let first = registry.connect_all().await;
        let second = registry.connect_all().await;
        assert_eq!(first, second);
        assert_eq!(a.connect_attempts(), 1);
    }

    #[tokio::test]
    async fn test_invocation_error_propagates_unchanged() {
        let conn = MockConnection::new("fs").with_tool("read", "Read a file", |_| {
            Err("permission denied".to_string())
        });
        let registry = registry(vec![conn]);
        registry.connect_all().await;

        let err = registry.call_tool("fs_read", json!({})).await.unwrap_err();
        assert_eq!(err, ToolError::invocation("fs", "read", "permission denied"));
    }

    #[tokio::test]
    async fn test_batch_isolates_failures() {
        let registry = registry(vec![server("fs", &["read"])]);
        registry.connect_all().await;

        let results = registry
            .call_tools(vec![
                ("fs_read".to_string(), json!({"path": "a"})),
                ("fs_missing".to_string(), json!({})),
                ("fs_read".to_string(), json!({"path": "b"})),
            ])
            .await;

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(ToolError::UnknownTool(_))));
        assert!(results[2].is_ok());
    }

    #[tokio::test]
    async fn test_execute_converts_errors_to_results() {
        let registry = registry(vec![server("fs", &["read"])]);
        registry.connect_all().await;

        let ok = registry
            .execute(
                &ToolCall::new("c1", "fs_read", r#"{"path":"/tmp"}"#),
                EmptyArgumentsPolicy::EmptyObject,
            )
            .await;
        assert!(!ok.is_error);
        assert_eq!(ok.call_id, "c1");
        assert!(ok.content.contains("/tmp"));

        let bad_json = registry
            .execute(
                &ToolCall::new("c2", "fs_read", r#"{"path":"#),
                EmptyArgumentsPolicy::EmptyObject,
            )
            .await;
        assert!(bad_json.is_error);
        assert!(bad_json.content.contains("Invalid arguments"));

        let unknown = registry
            .execute(&ToolCall::new("c3", "git_log", "{}"), EmptyArgumentsPolicy::EmptyObject)
            .await;
        assert!(unknown.is_error);
        assert!(unknown.content.contains("Unknown tool"));

        let empty = registry
            .execute(&ToolCall::new("c4", "fs_read", ""), EmptyArgumentsPolicy::Reject)
            .await;
        assert!(empty.is_error);
    }

    #[tokio::test]
    async fn test_close_all_aggregates_failures() {
        let a = Arc::new(server("a", &["one"]));
        let b = Arc::new(server("b", &["two"]).failing_close("pipe closed"));
        let c = Arc::new(server("c", &["three"]).failing_close("timeout"));
        let registry = ToolRegistry::new(
            vec![
                a.clone() as Arc<dyn ToolConnection>,
                b.clone() as Arc<dyn ToolConnection>,
                c.clone() as Arc<dyn ToolConnection>,
            ],
            Arc::new(NoOpLogger),
        );
        registry.connect_all().await;

        match registry.close_all().await {
            Err(ToolError::Close { failures }) => assert_eq!(failures.len(), 2),
            other => panic!("expected close failure, got {:?}", other),
        }
        // Every connection was still closed.
        assert_eq!(a.close_count(), 1);
        assert_eq!(b.close_count(), 1);
        assert_eq!(c.close_count(), 1);
        assert!(registry
            .statuses()
            .iter()
            .all(|(_, liveness)| *liveness != Liveness::Connected));
    }

    #[tokio::test]
    async fn test_from_config_skips_disabled() {
        use crate::config::ServerConfig;

        let config = ServersConfig::new()
            .with_server("fs", ServerConfig::new("npx", ["server-filesystem"]))
            .with_server("git", ServerConfig::new("uvx", ["mcp-server-git"]).disabled());
        let registry = ToolRegistry::from_config(&config, Arc::new(NoOpLogger));

        assert_eq!(registry.server_count(), 1);
        assert_eq!(
            registry.statuses(),
            vec![("fs".to_string(), Liveness::Disconnected)]
        );
    }
}
