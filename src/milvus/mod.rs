//! Milvus access layer.
//!
//! - [`MilvusClient`] — the seam to the database: one method per remote call
//! - [`RestClient`] — the production client, speaking the Milvus RESTful API v2
//! - [`MilvusConnector`] — the five operations exposed as tools, with failures
//!   normalised into [`OperationError`]
//!
//! The connector holds the client behind an `Arc<dyn MilvusClient>`, so tests
//! can substitute an in-process fake for the HTTP client.

pub mod connector;
pub mod error;
pub mod rest;

pub use connector::MilvusConnector;
pub use error::{ClientError, ClientResult, Operation, OperationError};
pub use rest::RestClient;

use std::future::Future;
use std::pin::Pin;

use serde_json::{Map, Value};

/// Field holding the sparse vectors used for full-text search.
pub const SPARSE_FIELD: &str = "sparse";

/// Result count for a search when the caller gives none.
pub const DEFAULT_SEARCH_LIMIT: u64 = 5;

/// Result count for a query when the caller gives none.
pub const DEFAULT_QUERY_LIMIT: u64 = 10;

/// Share of low-frequency terms dropped from scoring when the caller gives none.
pub const DEFAULT_DROP_RATIO: f64 = 0.2;

/// A single entity as returned by search or query, keys in server order.
pub type Record = Map<String, Value>;

/// Boxed future returned by [`MilvusClient`] methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Parameters of a sparse full-text search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Collection to search.
    pub collection_name: String,
    /// Raw query text; Milvus tokenises it against [`SPARSE_FIELD`].
    pub query_text: String,
    /// Maximum number of hits.
    pub limit: u64,
    /// Fields to return; `None` lets the server decide.
    pub output_fields: Option<Vec<String>>,
    /// Forwarded as `drop_ratio_search`. Not range-checked.
    pub drop_ratio: f64,
}

impl SearchRequest {
    /// Creates a search with default limit, output fields and drop ratio.
    pub fn new(collection_name: impl Into<String>, query_text: impl Into<String>) -> Self {
        Self {
            collection_name: collection_name.into(),
            query_text: query_text.into(),
            limit: DEFAULT_SEARCH_LIMIT,
            output_fields: None,
            drop_ratio: DEFAULT_DROP_RATIO,
        }
    }

    /// Sets the maximum number of hits.
    #[must_use]
    pub const fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the fields to return.
    #[must_use]
    pub fn with_output_fields(mut self, output_fields: Vec<String>) -> Self {
        self.output_fields = Some(output_fields);
        self
    }

    /// Sets the drop ratio.
    #[must_use]
    pub const fn with_drop_ratio(mut self, drop_ratio: f64) -> Self {
        self.drop_ratio = drop_ratio;
        self
    }
}

/// Parameters of a filtered query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    /// Collection to query.
    pub collection_name: String,
    /// Boolean filter expression, e.g. `age > 20`.
    pub filter_expr: String,
    /// Fields to return; `None` lets the server decide.
    pub output_fields: Option<Vec<String>>,
    /// Maximum number of records.
    pub limit: u64,
}

impl QueryRequest {
    /// Creates a query with default limit and output fields.
    pub fn new(collection_name: impl Into<String>, filter_expr: impl Into<String>) -> Self {
        Self {
            collection_name: collection_name.into(),
            filter_expr: filter_expr.into(),
            output_fields: None,
            limit: DEFAULT_QUERY_LIMIT,
        }
    }

    /// Sets the maximum number of records.
    #[must_use]
    pub const fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the fields to return.
    #[must_use]
    pub fn with_output_fields(mut self, output_fields: Vec<String>) -> Self {
        self.output_fields = Some(output_fields);
        self
    }
}

/// Raw access to a Milvus database.
///
/// Implementations must be safe to share across concurrent calls; the
/// connector never locks around them.
pub trait MilvusClient: Send + Sync {
    /// Lists the names of all collections in the configured database.
    fn list_collections(&self) -> BoxFuture<'_, ClientResult<Vec<String>>>;

    /// Returns the schema and metadata of a collection.
    fn describe_collection<'a>(&'a self, collection_name: &'a str)
        -> BoxFuture<'a, ClientResult<Value>>;

    /// Runs a sparse full-text search.
    fn search<'a>(&'a self, request: &'a SearchRequest) -> BoxFuture<'a, ClientResult<Vec<Record>>>;

    /// Runs a filtered query.
    fn query<'a>(&'a self, request: &'a QueryRequest) -> BoxFuture<'a, ClientResult<Vec<Record>>>;

    /// Counts the entities of a collection, optionally restricted by a filter.
    fn count<'a>(
        &'a self,
        collection_name: &'a str,
        filter_expr: Option<&'a str>,
    ) -> BoxFuture<'a, ClientResult<u64>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_request_defaults() {
        let request = SearchRequest::new("docs", "rust");
        assert_eq!(request.limit, 5);
        assert!(request.output_fields.is_none());
        assert!((request.drop_ratio - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn query_request_defaults() {
        let request = QueryRequest::new("docs", "age > 20");
        assert_eq!(request.limit, 10);
        assert!(request.output_fields.is_none());
    }

    #[test]
    fn builders_override_defaults() {
        let search = SearchRequest::new("docs", "rust")
            .with_limit(3)
            .with_output_fields(vec!["title".to_string()])
            .with_drop_ratio(0.5);
        assert_eq!(search.limit, 3);
        assert_eq!(search.output_fields, Some(vec!["title".to_string()]));
        assert!((search.drop_ratio - 0.5).abs() < f64::EPSILON);

        let query = QueryRequest::new("docs", "id in [1, 2]").with_limit(1);
        assert_eq!(query.limit, 1);
    }
}
