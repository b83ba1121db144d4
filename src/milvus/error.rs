//! Error types for Milvus client and connector operations.

use thiserror::Error;

/// Result type for raw Milvus client calls.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors raised by a [`MilvusClient`](super::MilvusClient) implementation.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The HTTP request could not be sent or its body could not be read.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// Milvus reported a failure in the response envelope.
    #[error("{message} (code {code})")]
    Api {
        /// Milvus error code.
        code: i64,
        /// Milvus error message.
        message: String,
    },

    /// The response did not have the expected shape.
    #[error("unexpected response: {message}")]
    Decode {
        /// What was wrong with the response.
        message: String,
    },
}

impl ClientError {
    /// Creates an API error.
    pub fn api(code: i64, message: impl Into<String>) -> Self {
        Self::Api {
            code,
            message: message.into(),
        }
    }

    /// Creates a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

/// The connector operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Listing collections.
    ListCollections,
    /// Describing a collection.
    CollectionInfo,
    /// Full-text search.
    Search,
    /// Filtered query.
    Query,
    /// Entity count.
    Count,
}

impl Operation {
    /// Fixed message prefix reported to tool callers.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::ListCollections => "Failed to list collections",
            Self::CollectionInfo => "Failed to get collection info",
            Self::Search => "Search failed",
            Self::Query => "Query failed",
            Self::Count => "Count failed",
        }
    }
}

/// A connector operation failed because the client did.
///
/// Every client failure maps to this one kind; network, not-found and
/// malformed-expression errors are not told apart here.
#[derive(Debug, Error)]
#[error("{}: {source}", .operation.prefix())]
pub struct OperationError {
    /// Which operation failed.
    pub operation: Operation,
    /// The client error.
    pub source: ClientError,
}

impl OperationError {
    /// Wraps a client error for `operation`.
    #[must_use]
    pub const fn new(operation: Operation, source: ClientError) -> Self {
        Self { operation, source }
    }
}
