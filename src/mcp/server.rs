//! MCP server implementation for Milvus.
//!
//! This module implements the MCP server lifecycle:
//!
//! 1. **Initialisation**: Capability negotiation and version agreement
//! 2. **Operation**: Handling tool calls and other requests
//! 3. **Shutdown**: EOF on the input, SIGINT or SIGTERM
//!
//! Tool calls are handled one at a time in arrival order. A failed tool call
//! is reported inside its result and never ends the session; only transport
//! I/O errors do.

use serde::Serialize;
use serde_json::json;
use tokio::io::{AsyncBufRead, AsyncWrite};

use crate::mcp::protocol::{
    decode, negotiate_protocol_version, InitializeParams, JsonRpcError, JsonRpcResponse, Message,
    Notification, Request, RequestId, ToolCallParams, SERVER_NAME,
};
use crate::mcp::tools::{tool_definitions, ToolDispatcher};
use crate::mcp::transport::{StdioTransport, Transport};

/// Server state in the MCP lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Waiting for initialize request.
    AwaitingInit,
    /// Initialize received, waiting for initialized notification.
    Initialising,
    /// Ready for normal operation.
    Running,
    /// Shutdown in progress.
    ShuttingDown,
}

/// Server capabilities advertised during initialisation.
#[derive(Debug, Clone, Serialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolCapabilities>,
}

impl Default for ServerCapabilities {
    fn default() -> Self {
        Self {
            tools: Some(ToolCapabilities::default()),
        }
    }
}

/// Tool-specific capabilities.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolCapabilities {
    /// Whether the tool list can change during the session. Always false here.
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

/// Server information for initialisation response.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// The MCP server exposing Milvus tools.
pub struct McpServer<R, W> {
    /// Current server state.
    state: ServerState,
    /// The transport layer.
    transport: Transport<R, W>,
    /// Negotiated protocol version (set after initialisation).
    protocol_version: Option<String>,
    /// Routes tool calls to Milvus.
    dispatcher: ToolDispatcher,
}

impl McpServer<tokio::io::BufReader<tokio::io::Stdin>, tokio::io::Stdout> {
    /// Creates a server speaking over stdin and stdout.
    #[must_use]
    pub fn stdio(dispatcher: ToolDispatcher) -> Self {
        Self::with_transport(dispatcher, StdioTransport::stdio())
    }
}

impl<R, W> McpServer<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a server over an arbitrary transport.
    pub const fn with_transport(dispatcher: ToolDispatcher, transport: Transport<R, W>) -> Self {
        Self {
            state: ServerState::AwaitingInit,
            transport,
            protocol_version: None,
            dispatcher,
        }
    }

    /// Returns the current server state.
    pub const fn state(&self) -> ServerState {
        self.state
    }

    /// Returns the negotiated protocol version, once initialised.
    pub fn protocol_version(&self) -> Option<&str> {
        self.protocol_version.as_deref()
    }

    /// Consumes the server, returning its transport.
    pub fn into_transport(self) -> Transport<R, W> {
        self.transport
    }

    /// Runs the MCP server main loop with graceful shutdown handling.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn run(&mut self) -> std::io::Result<()> {
        self.run_with_shutdown().await
    }

    /// Runs the main loop and handles shutdown.
    #[cfg(unix)]
    async fn run_with_shutdown(&mut self) -> std::io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt()).map_err(std::io::Error::other)?;
        let mut sigterm = signal(SignalKind::terminate()).map_err(std::io::Error::other)?;

        loop {
            tokio::select! {
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                line_result = self.transport.read_line() => {
                    if self.handle_transport_result(line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Runs the main loop and handles shutdown.
    #[cfg(windows)]
    async fn run_with_shutdown(&mut self) -> std::io::Result<()> {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    tracing::info!("Received Ctrl+C, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                line_result = self.transport.read_line() => {
                    if self.handle_transport_result(line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Handles the result from transport read.
    ///
    /// Returns `true` if the server should shut down.
    async fn handle_transport_result(
        &mut self,
        line_result: std::io::Result<Option<Vec<u8>>>,
    ) -> std::io::Result<bool> {
        let Some(line) = line_result? else {
            tracing::info!("Input closed, shutting down");
            self.state = ServerState::ShuttingDown;
            return Ok(true);
        };

        if line.iter().all(u8::is_ascii_whitespace) {
            return Ok(false);
        }

        self.handle_line(&line).await?;

        Ok(self.state == ServerState::ShuttingDown)
    }

    /// Handles a single line of input.
    async fn handle_line(&mut self, line: &[u8]) -> std::io::Result<()> {
        match decode(line) {
            Ok(Message::Request { id, request }) => self.handle_request(id, request).await,
            Ok(Message::Notification(notification)) => {
                self.handle_notification(&notification);
                Ok(())
            }
            Err(error) => {
                tracing::debug!(
                    code = error.error.code,
                    message = %error.error.message,
                    "Rejected message"
                );
                self.transport.write_message(&error).await
            }
        }
    }

    /// Handles an incoming request.
    async fn handle_request(&mut self, id: RequestId, request: Request) -> std::io::Result<()> {
        tracing::debug!(%id, method = request.method(), "Request");

        let response = match request {
            Request::Initialize(params) => self.handle_initialize(id, &params),
            Request::ListTools => self.handle_tools_list(id),
            Request::CallTool(params) => self.handle_tools_call(id, &params).await,
            Request::Ping => Ok(JsonRpcResponse::success(id, json!({}))),
        };

        match response {
            Ok(resp) => self.transport.write_message(&resp).await,
            Err(error) => self.transport.write_message(&error).await,
        }
    }

    /// Handles an incoming notification.
    fn handle_notification(&mut self, notification: &Notification) {
        match notification {
            Notification::Initialized if self.state == ServerState::Initialising => {
                tracing::info!("Client initialised, session running");
                self.state = ServerState::Running;
            }
            Notification::Initialized => {
                tracing::debug!(state = ?self.state, "Ignoring out-of-order initialized");
            }
            Notification::Other(method) => {
                tracing::debug!(%method, "Ignoring notification");
            }
        }
    }

    /// Handles the initialize request.
    fn handle_initialize(
        &mut self,
        id: RequestId,
        params: &InitializeParams,
    ) -> Result<JsonRpcResponse, JsonRpcError> {
        if self.state != ServerState::AwaitingInit {
            return Err(JsonRpcError::invalid_request(
                Some(id),
                "Server already initialised",
            ));
        }

        let negotiated_version = negotiate_protocol_version(&params.protocol_version);
        tracing::info!(
            client = ?params.client_info.as_ref().map(|c| c.name.as_str()),
            requested = %params.protocol_version,
            negotiated = negotiated_version,
            "Initialising session"
        );

        self.protocol_version = Some(negotiated_version.to_string());
        self.state = ServerState::Initialising;

        let result = json!({
            "protocolVersion": negotiated_version,
            "capabilities": ServerCapabilities::default(),
            "serverInfo": ServerInfo::default(),
        });

        Ok(JsonRpcResponse::success(id, result))
    }

    /// Handles the tools/list request.
    fn handle_tools_list(&self, id: RequestId) -> Result<JsonRpcResponse, JsonRpcError> {
        let id = self.require_running(id)?;

        Ok(JsonRpcResponse::success(
            id,
            json!({ "tools": tool_definitions() }),
        ))
    }

    /// Handles the tools/call request.
    async fn handle_tools_call(
        &self,
        id: RequestId,
        params: &ToolCallParams,
    ) -> Result<JsonRpcResponse, JsonRpcError> {
        let id = self.require_running(id)?;

        let result = self
            .dispatcher
            .call(&params.name, &params.arguments)
            .await;

        match serde_json::to_value(&result) {
            Ok(value) => Ok(JsonRpcResponse::success(id, value)),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialise tool call result");
                Err(JsonRpcError::internal_error(
                    id,
                    "Internal error: failed to serialise result",
                ))
            }
        }
    }

    /// Passes `id` through when the session is running.
    fn require_running(&self, id: RequestId) -> Result<RequestId, JsonRpcError> {
        if self.state == ServerState::Running {
            Ok(id)
        } else {
            Err(JsonRpcError::invalid_request(Some(id), "Server not initialised"))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::Value;

    use super::*;
    use crate::milvus::{
        BoxFuture, ClientResult, MilvusClient, MilvusConnector, QueryRequest, Record,
        SearchRequest,
    };

    /// A client for an empty database.
    struct EmptyClient;

    impl MilvusClient for EmptyClient {
        fn list_collections(&self) -> BoxFuture<'_, ClientResult<Vec<String>>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn describe_collection<'a>(&'a self, _: &'a str) -> BoxFuture<'a, ClientResult<Value>> {
            Box::pin(async { Ok(json!({})) })
        }

        fn search<'a>(&'a self, _: &'a SearchRequest) -> BoxFuture<'a, ClientResult<Vec<Record>>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn query<'a>(&'a self, _: &'a QueryRequest) -> BoxFuture<'a, ClientResult<Vec<Record>>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn count<'a>(&'a self, _: &'a str, _: Option<&'a str>) -> BoxFuture<'a, ClientResult<u64>> {
            Box::pin(async { Ok(0) })
        }
    }

    fn server() -> McpServer<&'static [u8], Vec<u8>> {
        let dispatcher = ToolDispatcher::new(MilvusConnector::new(Arc::new(EmptyClient)));
        McpServer::with_transport(dispatcher, Transport::new(&b""[..], Vec::new()))
    }

    fn init(version: &str) -> InitializeParams {
        InitializeParams {
            protocol_version: version.to_string(),
            capabilities: Value::Null,
            client_info: None,
        }
    }

    fn count_call() -> ToolCallParams {
        ToolCallParams {
            name: "milvus-count".to_string(),
            arguments: json!({"collection_name": "docs"}),
        }
    }

    #[test]
    fn server_initial_state() {
        let server = server();
        assert_eq!(server.state(), ServerState::AwaitingInit);
        assert!(server.protocol_version().is_none());
    }

    #[test]
    fn initialize_moves_to_initialising() {
        let mut server = server();
        let response = server
            .handle_initialize(RequestId::Number(1), &init("2024-11-05"))
            .unwrap();

        assert_eq!(server.state(), ServerState::Initialising);
        assert_eq!(server.protocol_version(), Some("2024-11-05"));
        assert_eq!(response.result["serverInfo"]["name"], "milvus");
        assert_eq!(response.result["capabilities"]["tools"]["listChanged"], false);
    }

    #[test]
    fn initialize_twice_is_rejected() {
        let mut server = server();
        server
            .handle_initialize(RequestId::Number(1), &init("2025-06-18"))
            .unwrap();

        let err = server
            .handle_initialize(RequestId::Number(2), &init("2025-06-18"))
            .unwrap_err();
        assert_eq!(err.error.message, "Server already initialised");
        assert_eq!(err.id, Some(RequestId::Number(2)));
    }

    #[test]
    fn tools_list_requires_running() {
        let server = server();
        let err = server.handle_tools_list(RequestId::Number(1)).unwrap_err();
        assert_eq!(err.error.code, -32600);
    }

    #[test]
    fn initialized_notification_starts_session() {
        let mut server = server();
        server.handle_notification(&Notification::Initialized);
        assert_eq!(server.state(), ServerState::AwaitingInit);

        server
            .handle_initialize(RequestId::Number(1), &init("2025-03-26"))
            .unwrap();
        server.handle_notification(&Notification::Other("notifications/progress".to_string()));
        assert_eq!(server.state(), ServerState::Initialising);

        server.handle_notification(&Notification::Initialized);
        assert_eq!(server.state(), ServerState::Running);

        let response = server.handle_tools_list(RequestId::Number(2)).unwrap();
        assert_eq!(response.result["tools"].as_array().map(Vec::len), Some(5));
    }

    #[tokio::test]
    async fn tools_call_requires_running() {
        let server = server();
        let err = server
            .handle_tools_call(RequestId::Number(3), &count_call())
            .await
            .unwrap_err();
        assert_eq!(err.error.message, "Server not initialised");
    }

    #[tokio::test]
    async fn tools_call_wraps_tool_result() {
        let mut server = server();
        server.state = ServerState::Running;

        let response = server
            .handle_tools_call(RequestId::Number(4), &count_call())
            .await
            .unwrap();
        assert_eq!(
            response.result,
            json!({"content": [{"type": "text", "text": "Count for collection 'docs': 0"}]})
        );
    }
}
