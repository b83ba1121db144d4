//! JSON-RPC 2.0 framing for the MCP methods this server understands.
//!
//! Incoming lines are decoded straight into [`Message`]: the method name is
//! resolved to a typed [`Request`] or [`Notification`] and its params are
//! deserialised at the same time, so the server never inspects raw method
//! strings. Anything that cannot be decoded becomes a ready-to-send
//! [`JsonRpcError`] carrying the request id when one could be recovered.
//!
//! | Failure | Code |
//! |---|---|
//! | not JSON, not UTF-8, not an object | `-32700` |
//! | bad `jsonrpc`, `id` or `method` field | `-32600` |
//! | unknown request method | `-32601` |
//! | params of the wrong shape | `-32602` |

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Protocol versions this server can speak, oldest first.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2024-11-05", "2025-03-26", "2025-06-18"];

/// The newest MCP protocol version this implementation supports.
pub const MCP_PROTOCOL_VERSION: &str = "2025-06-18";

/// Server name reported in `initialize`.
pub const SERVER_NAME: &str = "milvus";

const JSONRPC_VERSION: &str = "2.0";

/// Picks the protocol version to answer an `initialize` request with.
///
/// A supported version requested by the client is echoed back; anything else
/// gets the newest version we know, and the client decides whether to proceed.
#[must_use]
pub fn negotiate_protocol_version(requested: &str) -> &'static str {
    SUPPORTED_PROTOCOL_VERSIONS
        .iter()
        .copied()
        .find(|v| *v == requested)
        .unwrap_or(MCP_PROTOCOL_VERSION)
}

/// Error codes sent back to the client.
pub mod codes {
    /// Not JSON, or not an object.
    pub const PARSE_ERROR: i32 = -32700;
    /// A JSON object that is not a valid request, or a request out of order.
    pub const INVALID_REQUEST: i32 = -32600;
    /// Unknown request method.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Params missing or of the wrong shape.
    pub const INVALID_PARAMS: i32 = -32602;
    /// The server failed while producing a result.
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// Request id: a string or an integer, never `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Integer id.
    Number(i64),
    /// String id.
    String(String),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

/// `clientInfo` from `initialize`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Params of `initialize`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by the client.
    pub protocol_version: String,
    /// Client capabilities; not interpreted.
    #[serde(default)]
    pub capabilities: Value,
    /// Client information.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// Params of `tools/call`.
///
/// `arguments` stays untyped here; each tool checks its own arguments so it
/// can name the offending parameter.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolCallParams {
    /// Tool name.
    pub name: String,
    /// Tool arguments; `null` when the client sent none.
    #[serde(default)]
    pub arguments: Value,
}

/// A request the server answers.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// `initialize`
    Initialize(InitializeParams),
    /// `tools/list`
    ListTools,
    /// `tools/call`
    CallTool(ToolCallParams),
    /// `ping`
    Ping,
}

impl Request {
    fn decode(id: &RequestId, method: &str, params: Value) -> Result<Self, JsonRpcError> {
        match method {
            "initialize" => typed_params(id, method, params).map(Self::Initialize),
            "tools/list" => Ok(Self::ListTools),
            "tools/call" => typed_params(id, method, params).map(Self::CallTool),
            "ping" => Ok(Self::Ping),
            _ => Err(JsonRpcError::method_not_found(id.clone(), method)),
        }
    }

    /// Wire name of the method.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::Initialize(_) => "initialize",
            Self::ListTools => "tools/list",
            Self::CallTool(_) => "tools/call",
            Self::Ping => "ping",
        }
    }
}

/// A notification from the client. None of them get a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// `notifications/initialized`
    Initialized,
    /// Any other notification, by method name.
    Other(String),
}

/// A decoded incoming line.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A request and the id its reply must carry.
    Request {
        /// Reply id.
        id: RequestId,
        /// The typed request.
        request: Request,
    },
    /// A notification.
    Notification(Notification),
}

/// Decodes one line of input.
///
/// The line may be any bytes; invalid UTF-8 is reported like any other
/// unparseable input.
///
/// # Errors
///
/// Returns the error response to send when the line is not a message this
/// server can act on.
pub fn decode(line: &[u8]) -> Result<Message, JsonRpcError> {
    let mut frame: Map<String, Value> =
        serde_json::from_slice(line).map_err(|_| JsonRpcError::parse_error())?;

    let id = match frame.remove("id") {
        None => None,
        Some(raw) => Some(serde_json::from_value::<RequestId>(raw).map_err(|_| {
            JsonRpcError::invalid_request(None, "id must be a string or an integer")
        })?),
    };

    if frame.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err(JsonRpcError::invalid_request(
            id,
            "jsonrpc field must be \"2.0\"",
        ));
    }

    let method = match frame.remove("method") {
        Some(Value::String(method)) if !method.is_empty() => method,
        _ => {
            return Err(JsonRpcError::invalid_request(
                id,
                "method must be a non-empty string",
            ))
        }
    };
    let params = frame.remove("params").unwrap_or(Value::Null);

    let Some(id) = id else {
        let notification = if method == "notifications/initialized" {
            Notification::Initialized
        } else {
            Notification::Other(method)
        };
        return Ok(Message::Notification(notification));
    };

    let request = Request::decode(&id, &method, params)?;
    Ok(Message::Request { id, request })
}

fn typed_params<T: DeserializeOwned>(
    id: &RequestId,
    method: &str,
    params: Value,
) -> Result<T, JsonRpcError> {
    if params.is_null() {
        return Err(JsonRpcError::invalid_params(
            id.clone(),
            format!("Missing {method} params"),
        ));
    }
    serde_json::from_value(params).map_err(|e| {
        JsonRpcError::invalid_params(id.clone(), format!("Invalid {method} params: {e}"))
    })
}

/// A successful reply.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    jsonrpc: &'static str,
    /// Id of the request being answered.
    pub id: RequestId,
    /// Method result.
    pub result: Value,
}

impl JsonRpcResponse {
    /// Creates a reply to `id`.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Value is not const-compatible
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result,
        }
    }
}

/// The `error` member of an error reply.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorObject {
    /// One of [`codes`].
    pub code: i32,
    /// Human-readable description.
    pub message: String,
}

/// An error reply. `id` is omitted when it could not be recovered.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    jsonrpc: &'static str,
    /// Id of the offending request, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    /// Code and message.
    pub error: ErrorObject,
}

impl JsonRpcError {
    fn new(id: Option<RequestId>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            error: ErrorObject {
                code,
                message: message.into(),
            },
        }
    }

    /// The input could not be parsed.
    #[must_use]
    pub fn parse_error() -> Self {
        Self::new(None, codes::PARSE_ERROR, "Parse error")
    }

    /// The message is not a valid request, or arrived in the wrong state.
    #[must_use]
    pub fn invalid_request(id: Option<RequestId>, message: impl Into<String>) -> Self {
        Self::new(id, codes::INVALID_REQUEST, message)
    }

    /// No such method.
    #[must_use]
    pub fn method_not_found(id: RequestId, method: &str) -> Self {
        Self::new(
            Some(id),
            codes::METHOD_NOT_FOUND,
            format!("Method not found: {method}"),
        )
    }

    /// Params missing or malformed.
    #[must_use]
    pub fn invalid_params(id: RequestId, message: impl Into<String>) -> Self {
        Self::new(Some(id), codes::INVALID_PARAMS, message)
    }

    /// The server failed to build a result.
    #[must_use]
    pub fn internal_error(id: RequestId, message: impl Into<String>) -> Self {
        Self::new(Some(id), codes::INTERNAL_ERROR, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode_str(line: &str) -> Result<Message, JsonRpcError> {
        decode(line.as_bytes())
    }

    fn decode_request(line: &str) -> (RequestId, Request) {
        match decode_str(line).unwrap() {
            Message::Request { id, request } => (id, request),
            Message::Notification(n) => panic!("expected a request, got {n:?}"),
        }
    }

    #[test]
    fn decodes_tools_call_params() {
        let (id, request) = decode_request(
            r#"{"jsonrpc": "2.0", "id": 1, "method": "tools/call",
                "params": {"name": "milvus-count", "arguments": {"collection_name": "docs"}}}"#,
        );

        assert_eq!(id, RequestId::Number(1));
        assert_eq!(
            request,
            Request::CallTool(ToolCallParams {
                name: "milvus-count".to_string(),
                arguments: json!({"collection_name": "docs"}),
            })
        );
    }

    #[test]
    fn tools_call_without_arguments_gets_null() {
        let (_, request) = decode_request(
            r#"{"jsonrpc": "2.0", "id": 1, "method": "tools/call", "params": {"name": "x"}}"#,
        );
        let Request::CallTool(params) = request else {
            panic!("expected tools/call");
        };
        assert!(params.arguments.is_null());
    }

    #[test]
    fn decodes_initialize_params() {
        let (_, request) = decode_request(
            r#"{"jsonrpc": "2.0", "id": "init", "method": "initialize",
                "params": {"protocolVersion": "2025-03-26", "clientInfo": {"name": "cli"}}}"#,
        );
        let Request::Initialize(params) = request else {
            panic!("expected initialize");
        };
        assert_eq!(params.protocol_version, "2025-03-26");
        assert_eq!(params.client_info.map(|c| c.name).as_deref(), Some("cli"));
    }

    #[test]
    fn unit_methods_ignore_params() {
        let (_, request) =
            decode_request(r#"{"jsonrpc": "2.0", "id": 2, "method": "tools/list", "params": {}}"#);
        assert_eq!(request, Request::ListTools);

        let (id, request) = decode_request(r#"{"jsonrpc": "2.0", "id": "p", "method": "ping"}"#);
        assert_eq!(request, Request::Ping);
        assert_eq!(id.to_string(), "p");
    }

    #[test]
    fn notifications_have_no_id() {
        assert_eq!(
            decode_str(r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#).unwrap(),
            Message::Notification(Notification::Initialized)
        );
        assert_eq!(
            decode_str(r#"{"jsonrpc": "2.0", "method": "notifications/cancelled", "params": {}}"#)
                .unwrap(),
            Message::Notification(Notification::Other("notifications/cancelled".to_string()))
        );
    }

    #[test]
    fn unparseable_input_is_parse_error() {
        for line in ["not valid json", "[1, 2, 3]", "42", ""] {
            let err = decode_str(line).unwrap_err();
            assert_eq!(err.error.code, codes::PARSE_ERROR, "{line:?}");
            assert!(err.id.is_none());
        }
    }

    #[test]
    fn invalid_utf8_is_parse_error() {
        let line = b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\",\"params\":{\"x\":\"\xff\"}}";
        let err = decode(line).unwrap_err();
        assert_eq!(err.error.code, codes::PARSE_ERROR);
    }

    #[test]
    fn bad_envelope_is_invalid_request() {
        let err = decode_str(r#"{"jsonrpc": "1.0", "id": 1, "method": "ping"}"#).unwrap_err();
        assert_eq!(err.error.code, codes::INVALID_REQUEST);
        assert_eq!(err.id, Some(RequestId::Number(1)));

        let err = decode_str(r#"{"jsonrpc": "2.0", "id": 9, "method": ""}"#).unwrap_err();
        assert_eq!(err.error.code, codes::INVALID_REQUEST);
        assert_eq!(err.id, Some(RequestId::Number(9)));

        let err = decode_str(r#"{"jsonrpc": "2.0", "id": null, "method": "ping"}"#).unwrap_err();
        assert_eq!(err.error.code, codes::INVALID_REQUEST);
        assert!(err.id.is_none());
    }

    #[test]
    fn unknown_method_keeps_id() {
        let err = decode_str(r#"{"jsonrpc": "2.0", "id": 3, "method": "resources/list"}"#)
            .unwrap_err();
        assert_eq!(err.error.code, codes::METHOD_NOT_FOUND);
        assert_eq!(err.error.message, "Method not found: resources/list");
        assert_eq!(err.id, Some(RequestId::Number(3)));
    }

    #[test]
    fn missing_or_malformed_params_are_invalid_params() {
        let err = decode_str(r#"{"jsonrpc": "2.0", "id": 1, "method": "initialize"}"#)
            .unwrap_err();
        assert_eq!(err.error.code, codes::INVALID_PARAMS);
        assert_eq!(err.error.message, "Missing initialize params");

        let err = decode_str(
            r#"{"jsonrpc": "2.0", "id": 4, "method": "tools/call", "params": {"arguments": {}}}"#,
        )
        .unwrap_err();
        assert_eq!(err.error.code, codes::INVALID_PARAMS);
        assert!(err.error.message.starts_with("Invalid tools/call params"));
        assert_eq!(err.id, Some(RequestId::Number(4)));
    }

    #[test]
    fn negotiate_known_version_is_echoed() {
        assert_eq!(negotiate_protocol_version("2024-11-05"), "2024-11-05");
        assert_eq!(negotiate_protocol_version("2025-03-26"), "2025-03-26");
    }

    #[test]
    fn negotiate_unknown_version_falls_back_to_latest() {
        assert_eq!(negotiate_protocol_version("1999-01-01"), MCP_PROTOCOL_VERSION);
    }

    #[test]
    fn error_reply_omits_unknown_id() {
        let json = serde_json::to_value(JsonRpcError::parse_error()).unwrap();
        assert_eq!(
            json,
            json!({"jsonrpc": "2.0", "error": {"code": -32700, "message": "Parse error"}})
        );
    }
}
