//! Milvus RESTful API v2 client.
//!
//! Every call is a `POST` to `<uri>/v2/vectordb/...` with a JSON body that
//! carries `dbName`. Responses use the envelope
//!
//! ```json
//! { "code": 0, "data": ..., "message": "..." }
//! ```
//!
//! where a non-zero `code` signals failure even on HTTP 200.

use serde::Deserialize;
use serde_json::{json, Value};

use super::{
    BoxFuture, ClientError, ClientResult, MilvusClient, QueryRequest, Record, SearchRequest,
    SPARSE_FIELD,
};
use crate::config::MilvusSettings;

const LIST_COLLECTIONS_PATH: &str = "/v2/vectordb/collections/list";
const DESCRIBE_COLLECTION_PATH: &str = "/v2/vectordb/collections/describe";
const SEARCH_PATH: &str = "/v2/vectordb/entities/search";
const QUERY_PATH: &str = "/v2/vectordb/entities/query";

/// Output field Milvus evaluates to the number of matching entities.
const COUNT_FIELD: &str = "count(*)";

/// Response envelope shared by all v2 endpoints.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Value,
}

/// HTTP client for one Milvus database.
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    db_name: String,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .field("db_name", &self.db_name)
            .finish_non_exhaustive()
    }
}

impl RestClient {
    /// Creates a client from resolved settings.
    ///
    /// No request is made; connection problems surface on the first call.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (e.g. the TLS
    /// backend fails to initialise).
    pub fn new(settings: &MilvusSettings) -> ClientResult<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("milvus-mcp/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base_url: settings.uri.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
            db_name: settings.db_name.clone(),
        })
    }

    /// Sends `body` to `path` and returns the envelope's `data`.
    async fn post(&self, path: &str, body: Value) -> ClientResult<Value> {
        let url = format!("{}{path}", self.base_url);
        tracing::trace!(%url, "Milvus request");

        let mut request = self.http.post(&url).json(&body);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: Envelope = response
            .json()
            .await
            .map_err(|e| ClientError::decode(format!("invalid response body: {e}")))?;

        if envelope.code != 0 {
            return Err(ClientError::api(
                envelope.code,
                envelope
                    .message
                    .unwrap_or_else(|| "unknown Milvus error".to_string()),
            ));
        }

        Ok(envelope.data)
    }

    fn records(data: Value) -> ClientResult<Vec<Record>> {
        match data {
            Value::Null => Ok(Vec::new()),
            other => serde_json::from_value(other)
                .map_err(|e| ClientError::decode(format!("expected a list of records: {e}"))),
        }
    }

    fn search_body(&self, request: &SearchRequest) -> Value {
        let mut body = json!({
            "dbName": self.db_name,
            "collectionName": request.collection_name,
            "data": [request.query_text],
            "annsField": SPARSE_FIELD,
            "limit": request.limit,
            "searchParams": {
                "params": { "drop_ratio_search": request.drop_ratio }
            },
        });
        if let Some(ref fields) = request.output_fields {
            body["outputFields"] = json!(fields);
        }
        body
    }

    fn query_body(&self, request: &QueryRequest) -> Value {
        let mut body = json!({
            "dbName": self.db_name,
            "collectionName": request.collection_name,
            "filter": request.filter_expr,
            "limit": request.limit,
        });
        if let Some(ref fields) = request.output_fields {
            body["outputFields"] = json!(fields);
        }
        body
    }

    fn count_body(&self, collection_name: &str, filter_expr: Option<&str>) -> Value {
        json!({
            "dbName": self.db_name,
            "collectionName": collection_name,
            "filter": filter_expr.unwrap_or_default(),
            "outputFields": [COUNT_FIELD],
        })
    }
}

impl MilvusClient for RestClient {
    fn list_collections(&self) -> BoxFuture<'_, ClientResult<Vec<String>>> {
        Box::pin(async move {
            let data = self
                .post(LIST_COLLECTIONS_PATH, json!({ "dbName": self.db_name }))
                .await?;
            match data {
                Value::Null => Ok(Vec::new()),
                other => serde_json::from_value(other).map_err(|e| {
                    ClientError::decode(format!("expected a list of collection names: {e}"))
                }),
            }
        })
    }

    fn describe_collection<'a>(
        &'a self,
        collection_name: &'a str,
    ) -> BoxFuture<'a, ClientResult<Value>> {
        Box::pin(async move {
            self.post(
                DESCRIBE_COLLECTION_PATH,
                json!({ "dbName": self.db_name, "collectionName": collection_name }),
            )
            .await
        })
    }

    fn search<'a>(&'a self, request: &'a SearchRequest) -> BoxFuture<'a, ClientResult<Vec<Record>>> {
        Box::pin(async move {
            let data = self.post(SEARCH_PATH, self.search_body(request)).await?;
            Self::records(data)
        })
    }

    fn query<'a>(&'a self, request: &'a QueryRequest) -> BoxFuture<'a, ClientResult<Vec<Record>>> {
        Box::pin(async move {
            let data = self.post(QUERY_PATH, self.query_body(request)).await?;
            Self::records(data)
        })
    }

    fn count<'a>(
        &'a self,
        collection_name: &'a str,
        filter_expr: Option<&'a str>,
    ) -> BoxFuture<'a, ClientResult<u64>> {
        Box::pin(async move {
            let data = self
                .post(QUERY_PATH, self.count_body(collection_name, filter_expr))
                .await?;
            data.get(0)
                .and_then(|row| row.get(COUNT_FIELD))
                .and_then(Value::as_u64)
                .ok_or_else(|| ClientError::decode(format!("missing `{COUNT_FIELD}` in response")))
        })
    }
}
