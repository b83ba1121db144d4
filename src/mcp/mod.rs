//! Model Context Protocol (MCP) server implementation.
//!
//! This module implements the MCP specification for exposing Milvus
//! operations as tools to AI assistants. The server communicates over stdio
//! transport using JSON-RPC 2.0 messages.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         MCP Server                          │
//! │                                                             │
//! │   ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    │
//! │   │  Transport  │───▶│   Server    │───▶│   Tools     │    │
//! │   │   (stdio)   │    │  (lifecycle)│    │ (dispatch)  │    │
//! │   └─────────────┘    └─────────────┘    └──────┬──────┘    │
//! │                                                │            │
//! └────────────────────────────────────────────────┼────────────┘
//!                                                  ▼
//!                                         MilvusConnector
//! ```
//!
//! # Protocol Version
//!
//! Protocol versions 2024-11-05 through 2025-06-18 are accepted.

pub mod protocol;
pub mod server;
pub mod tools;
pub mod transport;

pub use protocol::{JsonRpcError, JsonRpcResponse, Message, Request, MCP_PROTOCOL_VERSION};
pub use server::McpServer;
pub use tools::{tool_definitions, ToolCallResult, ToolContent, ToolDispatcher, ToolError};
pub use transport::{StdioTransport, Transport};
