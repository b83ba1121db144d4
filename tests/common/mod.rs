//! Shared test fixtures: an in-process Milvus client with canned answers.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use milvus_mcp::mcp::ToolDispatcher;
use milvus_mcp::milvus::{
    BoxFuture, ClientError, ClientResult, MilvusClient, MilvusConnector, QueryRequest, Record,
    SearchRequest,
};
use serde_json::Value;

/// A call received by [`FakeClient`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListCollections,
    Describe(String),
    Search(SearchRequest),
    Query(QueryRequest),
    Count(String, Option<String>),
}

/// Milvus stand-in returning fixed data, or failing every call.
#[derive(Default)]
pub struct FakeClient {
    pub collections: Vec<String>,
    pub info: Value,
    pub records: Vec<Record>,
    pub count: u64,
    pub failure: Option<String>,
    pub calls: Mutex<Vec<Call>>,
}

impl FakeClient {
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn answer<T>(&self, call: Call, value: T) -> ClientResult<T> {
        self.calls.lock().unwrap().push(call);
        match self.failure {
            Some(ref message) => Err(ClientError::api(1, message.clone())),
            None => Ok(value),
        }
    }
}

impl MilvusClient for FakeClient {
    fn list_collections(&self) -> BoxFuture<'_, ClientResult<Vec<String>>> {
        Box::pin(async move { self.answer(Call::ListCollections, self.collections.clone()) })
    }

    fn describe_collection<'a>(
        &'a self,
        collection_name: &'a str,
    ) -> BoxFuture<'a, ClientResult<Value>> {
        Box::pin(async move {
            self.answer(
                Call::Describe(collection_name.to_string()),
                self.info.clone(),
            )
        })
    }

    fn search<'a>(&'a self, request: &'a SearchRequest) -> BoxFuture<'a, ClientResult<Vec<Record>>> {
        Box::pin(async move { self.answer(Call::Search(request.clone()), self.records.clone()) })
    }

    fn query<'a>(&'a self, request: &'a QueryRequest) -> BoxFuture<'a, ClientResult<Vec<Record>>> {
        Box::pin(async move { self.answer(Call::Query(request.clone()), self.records.clone()) })
    }

    fn count<'a>(
        &'a self,
        collection_name: &'a str,
        filter_expr: Option<&'a str>,
    ) -> BoxFuture<'a, ClientResult<u64>> {
        Box::pin(async move {
            self.answer(
                Call::Count(collection_name.to_string(), filter_expr.map(str::to_string)),
                self.count,
            )
        })
    }
}

/// Builds a dispatcher over `client`, keeping a handle for call inspection.
pub fn dispatcher(client: FakeClient) -> (ToolDispatcher, Arc<FakeClient>) {
    let client = Arc::new(client);
    let connector = MilvusConnector::new(client.clone());
    (ToolDispatcher::new(connector), client)
}

/// Builds a record from a JSON object literal.
pub fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}
