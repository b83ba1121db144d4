//! milvus-mcp: MCP server exposing a Milvus database as tools
//!
//! This library lets AI assistants explore a Milvus vector database through
//! five Model Context Protocol tools:
//!
//! - `milvus-list-collections` — names of all collections
//! - `milvus-collection-info` — schema and metadata of one collection
//! - `milvus-text-search` — sparse full-text search on the `sparse` field
//! - `milvus-query` — records matching a filter expression
//! - `milvus-count` — entity count, optionally filtered
//!
//! Ranking, tokenisation and filter evaluation all happen inside Milvus; this
//! crate only translates between MCP tool calls and the Milvus RESTful API.
//!
//! # Modules
//!
//! - [`config`] — Configuration loading and connection settings
//! - [`error`] — Configuration error types
//! - [`mcp`] — MCP protocol, transport, server lifecycle and tool dispatch
//! - [`milvus`] — Milvus client trait, REST client and connector

pub mod config;
pub mod error;
pub mod mcp;
pub mod milvus;
