//! The five Milvus operations exposed as tools.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use super::{
    ClientError, ClientResult, MilvusClient, Operation, OperationError, QueryRequest, Record,
    RestClient, SearchRequest,
};
use crate::config::MilvusSettings;

/// Adapter between tool calls and a [`MilvusClient`].
///
/// Stateless apart from the shared client handle. Every failure comes back as
/// an [`OperationError`] carrying the operation's fixed message prefix.
#[derive(Clone)]
pub struct MilvusConnector {
    client: Arc<dyn MilvusClient>,
}

impl std::fmt::Debug for MilvusConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MilvusConnector").finish_non_exhaustive()
    }
}

impl MilvusConnector {
    /// Creates a connector over an existing client.
    #[must_use]
    pub fn new(client: Arc<dyn MilvusClient>) -> Self {
        Self { client }
    }

    /// Creates a connector backed by a [`RestClient`].
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn connect(settings: &MilvusSettings) -> Result<Self, ClientError> {
        let client = RestClient::new(settings)?;
        Ok(Self::new(Arc::new(client)))
    }

    /// Lists all collections in the database.
    ///
    /// # Errors
    ///
    /// Returns an [`OperationError`] if the client call fails.
    pub async fn list_collections(&self) -> Result<Vec<String>, OperationError> {
        debug!("Listing collections");
        normalise(Operation::ListCollections, self.client.list_collections().await)
    }

    /// Returns the schema and metadata of `collection_name`.
    ///
    /// # Errors
    ///
    /// Returns an [`OperationError`] if the client call fails.
    pub async fn get_collection_info(
        &self,
        collection_name: &str,
    ) -> Result<Value, OperationError> {
        debug!(collection = collection_name, "Describing collection");
        normalise(
            Operation::CollectionInfo,
            self.client.describe_collection(collection_name).await,
        )
    }

    /// Runs a full-text search against the collection's sparse field.
    ///
    /// # Errors
    ///
    /// Returns an [`OperationError`] if the client call fails.
    pub async fn search_collection(
        &self,
        request: &SearchRequest,
    ) -> Result<Vec<Record>, OperationError> {
        debug!(
            collection = %request.collection_name,
            query = %request.query_text,
            limit = request.limit,
            drop_ratio = request.drop_ratio,
            "Searching collection"
        );
        normalise(Operation::Search, self.client.search(request).await)
    }

    /// Returns the records matching a filter expression.
    ///
    /// # Errors
    ///
    /// Returns an [`OperationError`] if the client call fails.
    pub async fn query_collection(
        &self,
        request: &QueryRequest,
    ) -> Result<Vec<Record>, OperationError> {
        debug!(
            collection = %request.collection_name,
            filter = %request.filter_expr,
            limit = request.limit,
            "Querying collection"
        );
        normalise(Operation::Query, self.client.query(request).await)
    }

    /// Counts the entities of `collection_name`, optionally filtered.
    ///
    /// # Errors
    ///
    /// Returns an [`OperationError`] if the client call fails.
    pub async fn count_entities(
        &self,
        collection_name: &str,
        filter_expr: Option<&str>,
    ) -> Result<u64, OperationError> {
        debug!(collection = collection_name, filter = ?filter_expr, "Counting entities");
        normalise(
            Operation::Count,
            self.client.count(collection_name, filter_expr).await,
        )
    }
}

fn normalise<T>(operation: Operation, result: ClientResult<T>) -> Result<T, OperationError> {
    result.map_err(|source| {
        warn!(error = %source, "{}", operation.prefix());
        OperationError::new(operation, source)
    })
}
