//! Milvus tool catalogue and dispatch.
//!
//! [`tool_definitions`] is what `tools/list` advertises. [`ToolDispatcher`]
//! routes a `tools/call` to the matching [`MilvusConnector`] operation and
//! renders the outcome as text content. Every failure, whether a bad argument,
//! an unknown tool or a Milvus error, comes back as a [`ToolCallResult`] with
//! `isError` set; nothing here can fail the JSON-RPC request itself.

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::milvus::{
    MilvusConnector, OperationError, QueryRequest, Record, SearchRequest, DEFAULT_DROP_RATIO,
    DEFAULT_QUERY_LIMIT, DEFAULT_SEARCH_LIMIT,
};

/// Full-text search tool.
pub const TEXT_SEARCH: &str = "milvus-text-search";
/// Collection listing tool.
pub const LIST_COLLECTIONS: &str = "milvus-list-collections";
/// Collection description tool.
pub const COLLECTION_INFO: &str = "milvus-collection-info";
/// Filtered query tool.
pub const QUERY: &str = "milvus-query";
/// Entity count tool.
pub const COUNT: &str = "milvus-count";

/// Marker wrapped around each search or query record.
const RECORD_MARKER: &str = "<r>";

/// A tool definition for tools/list response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
}

/// Content item in a tool call response.
///
/// Only text is produced today; the protocol also allows image and embedded
/// resource content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
#[non_exhaustive]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

impl ToolContent {
    /// Creates a text content item.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Returns the text if this is a text item.
    #[must_use]
    #[allow(clippy::unnecessary_wraps)] // more content kinds are expected
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
        }
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's skip_serializing_if requires a predicate fn(&T) -> bool
const fn is_false(b: &bool) -> bool {
    !*b
}

/// Result of a tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
    /// Whether the tool call resulted in an error.
    #[serde(skip_serializing_if = "is_false")]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Creates a successful result from content items.
    #[must_use]
    pub const fn success(content: Vec<ToolContent>) -> Self {
        Self {
            content,
            is_error: false,
        }
    }

    /// Creates a successful single-text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::success(vec![ToolContent::text(text)])
    }

    /// Creates an error text result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::text(message)],
            is_error: true,
        }
    }

    /// Returns all text items in order.
    #[must_use]
    pub fn texts(&self) -> Vec<&str> {
        self.content.iter().filter_map(ToolContent::as_text).collect()
    }
}

/// Why a tool call failed.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The tool name is not in the catalogue.
    #[error("Unknown tool: {name}")]
    UnknownTool {
        /// Requested tool name.
        name: String,
    },

    /// A required argument was not supplied.
    #[error("Missing required parameter: {name}")]
    MissingArgument {
        /// Argument name.
        name: &'static str,
    },

    /// An argument had the wrong JSON type.
    #[error("Invalid parameter '{name}': expected {expected}")]
    InvalidArgument {
        /// Argument name.
        name: &'static str,
        /// Description of the accepted type.
        expected: &'static str,
    },

    /// Milvus rejected or failed the operation.
    #[error(transparent)]
    Operation(#[from] OperationError),
}

/// Returns the five tool definitions advertised by `tools/list`.
#[must_use]
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: TEXT_SEARCH.to_string(),
            description: "Search for documents using full text search in a Milvus collection"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "collection_name": {
                        "type": "string",
                        "description": "Name of the collection to search"
                    },
                    "query_text": {
                        "type": "string",
                        "description": "Text to search for"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of results to return",
                        "default": DEFAULT_SEARCH_LIMIT
                    },
                    "output_fields": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Fields to include in results"
                    },
                    "drop_ratio": {
                        "type": "number",
                        "description": "Proportion of low-frequency terms to ignore (0.0-1.0)",
                        "default": DEFAULT_DROP_RATIO
                    }
                },
                "required": ["collection_name", "query_text"]
            }),
        },
        ToolDefinition {
            name: LIST_COLLECTIONS.to_string(),
            description: "List all collections in the database".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        },
        ToolDefinition {
            name: COLLECTION_INFO.to_string(),
            description: "Get detailed information about a collection".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "collection_name": {
                        "type": "string",
                        "description": "Name of the collection"
                    }
                },
                "required": ["collection_name"]
            }),
        },
        ToolDefinition {
            name: QUERY.to_string(),
            description: "Query collection using filter expressions".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "collection_name": {
                        "type": "string",
                        "description": "Name of the collection to query"
                    },
                    "filter_expr": {
                        "type": "string",
                        "description": "Filter expression (e.g. 'age > 20')"
                    },
                    "output_fields": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Fields to include in results"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of results",
                        "default": DEFAULT_QUERY_LIMIT
                    }
                },
                "required": ["collection_name", "filter_expr"]
            }),
        },
        ToolDefinition {
            name: COUNT.to_string(),
            description: "Count entities in a collection".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "collection_name": {
                        "type": "string",
                        "description": "Name of the collection"
                    },
                    "filter_expr": {
                        "type": "string",
                        "description": "Optional filter expression"
                    }
                },
                "required": ["collection_name"]
            }),
        },
    ]
}

/// Routes tool calls to a [`MilvusConnector`].
#[derive(Debug, Clone)]
pub struct ToolDispatcher {
    connector: MilvusConnector,
}

impl ToolDispatcher {
    /// Creates a dispatcher over `connector`.
    #[must_use]
    pub const fn new(connector: MilvusConnector) -> Self {
        Self { connector }
    }

    /// Runs the tool `name` with `arguments` and renders the outcome.
    ///
    /// `arguments` may be `null` when the caller sent none.
    pub async fn call(&self, name: &str, arguments: &Value) -> ToolCallResult {
        match self.dispatch(name, arguments).await {
            Ok(content) => ToolCallResult::success(content),
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "Tool call failed");
                ToolCallResult::error(e.to_string())
            }
        }
    }

    async fn dispatch(&self, name: &str, arguments: &Value) -> Result<Vec<ToolContent>, ToolError> {
        tracing::debug!(tool = name, "Dispatching tool call");
        let args = Arguments(arguments);

        match name {
            TEXT_SEARCH => self.text_search(args).await,
            LIST_COLLECTIONS => self.list_collections().await,
            COLLECTION_INFO => self.collection_info(args).await,
            QUERY => self.query(args).await,
            COUNT => self.count(args).await,
            _ => Err(ToolError::UnknownTool {
                name: name.to_string(),
            }),
        }
    }

    async fn text_search(&self, args: Arguments<'_>) -> Result<Vec<ToolContent>, ToolError> {
        let collection_name = args.required_str("collection_name")?;
        let query_text = args.required_str("query_text")?;

        let mut request = SearchRequest::new(collection_name, query_text)
            .with_limit(args.u64_or("limit", DEFAULT_SEARCH_LIMIT)?)
            .with_drop_ratio(args.f64_or("drop_ratio", DEFAULT_DROP_RATIO)?);
        if let Some(fields) = args.optional_string_list("output_fields")? {
            request = request.with_output_fields(fields);
        }

        let records = self.connector.search_collection(&request).await?;
        Ok(render_records(
            format!("Search results for '{query_text}' in collection '{collection_name}':"),
            records,
        ))
    }

    async fn list_collections(&self) -> Result<Vec<ToolContent>, ToolError> {
        let collections = self.connector.list_collections().await?;
        Ok(vec![ToolContent::text(format!(
            "Collections in database:\n{}",
            collections.join(", ")
        ))])
    }

    async fn collection_info(&self, args: Arguments<'_>) -> Result<Vec<ToolContent>, ToolError> {
        let collection_name = args.required_str("collection_name")?;
        let info = self.connector.get_collection_info(collection_name).await?;
        let rendered = serde_json::to_string_pretty(&info).unwrap_or_else(|_| info.to_string());
        Ok(vec![ToolContent::text(format!(
            "Collection info for '{collection_name}':\n{rendered}"
        ))])
    }

    async fn query(&self, args: Arguments<'_>) -> Result<Vec<ToolContent>, ToolError> {
        let collection_name = args.required_str("collection_name")?;
        let filter_expr = args.required_str("filter_expr")?;

        let mut request = QueryRequest::new(collection_name, filter_expr)
            .with_limit(args.u64_or("limit", DEFAULT_QUERY_LIMIT)?);
        if let Some(fields) = args.optional_string_list("output_fields")? {
            request = request.with_output_fields(fields);
        }

        let records = self.connector.query_collection(&request).await?;
        Ok(render_records(
            format!("Query results for '{filter_expr}' in collection '{collection_name}':"),
            records,
        ))
    }

    async fn count(&self, args: Arguments<'_>) -> Result<Vec<ToolContent>, ToolError> {
        let collection_name = args.required_str("collection_name")?;
        let filter_expr = args.optional_str("filter_expr")?;

        let count = self
            .connector
            .count_entities(collection_name, filter_expr)
            .await?;

        let mut message = format!("Count for collection '{collection_name}'");
        if let Some(filter) = filter_expr.filter(|f| !f.is_empty()) {
            message.push_str(&format!(" with filter '{filter}'"));
        }
        message.push_str(&format!(": {count}"));
        Ok(vec![ToolContent::text(message)])
    }
}

/// One header item, then one marker-wrapped item per record.
fn render_records(header: String, records: Vec<Record>) -> Vec<ToolContent> {
    let mut content = Vec::with_capacity(records.len() + 1);
    content.push(ToolContent::text(header));
    content.extend(records.into_iter().map(|record| {
        ToolContent::text(format!(
            "{RECORD_MARKER}{}{RECORD_MARKER}",
            Value::Object(record)
        ))
    }));
    content
}

/// Typed access to a tool call's argument object. `null` counts as absent.
#[derive(Clone, Copy)]
struct Arguments<'a>(&'a Value);

impl<'a> Arguments<'a> {
    fn get(self, name: &str) -> Option<&'a Value> {
        self.0.get(name).filter(|v| !v.is_null())
    }

    fn required_str(self, name: &'static str) -> Result<&'a str, ToolError> {
        self.optional_str(name)?
            .ok_or(ToolError::MissingArgument { name })
    }

    fn optional_str(self, name: &'static str) -> Result<Option<&'a str>, ToolError> {
        self.get(name)
            .map(|v| {
                v.as_str().ok_or(ToolError::InvalidArgument {
                    name,
                    expected: "a string",
                })
            })
            .transpose()
    }

    fn u64_or(self, name: &'static str, default: u64) -> Result<u64, ToolError> {
        self.get(name).map_or(Ok(default), |v| {
            v.as_u64().ok_or(ToolError::InvalidArgument {
                name,
                expected: "a non-negative integer",
            })
        })
    }

    fn f64_or(self, name: &'static str, default: f64) -> Result<f64, ToolError> {
        self.get(name).map_or(Ok(default), |v| {
            v.as_f64().ok_or(ToolError::InvalidArgument {
                name,
                expected: "a number",
            })
        })
    }

    fn optional_string_list(self, name: &'static str) -> Result<Option<Vec<String>>, ToolError> {
        let invalid = ToolError::InvalidArgument {
            name,
            expected: "an array of strings",
        };
        let Some(value) = self.get(name) else {
            return Ok(None);
        };
        let Some(items) = value.as_array() else {
            return Err(invalid);
        };
        items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .map(Some)
            .ok_or(invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_has_five_tools() {
        let tools = tool_definitions();
        assert_eq!(tools.len(), 5);

        for tool in &tools {
            assert!(!tool.name.is_empty());
            assert!(!tool.description.is_empty());
            assert_eq!(tool.input_schema["type"], "object");
        }

        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            [TEXT_SEARCH, LIST_COLLECTIONS, COLLECTION_INFO, QUERY, COUNT]
        );
    }

    #[test]
    fn schemas_declare_defaults() {
        let tools = tool_definitions();
        let search = &tools[0].input_schema["properties"];
        assert_eq!(search["limit"]["default"], 5);
        assert_eq!(search["drop_ratio"]["default"], 0.2);
        assert_eq!(search["drop_ratio"]["type"], "number");
        assert_eq!(search["output_fields"]["items"]["type"], "string");

        let query = &tools[3].input_schema["properties"];
        assert_eq!(query["limit"]["default"], 10);
    }

    #[test]
    fn definition_serialises_camel_case() {
        let json = serde_json::to_value(&tool_definitions()[1]).unwrap();
        assert_eq!(json["name"], "milvus-list-collections");
        assert!(json.get("inputSchema").is_some());
    }

    #[test]
    fn tool_call_result_text() {
        let result = ToolCallResult::text("Hello, world!");
        assert!(!result.is_error);
        assert_eq!(result.texts(), ["Hello, world!"]);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json, json!({"content": [{"type": "text", "text": "Hello, world!"}]}));
    }

    #[test]
    fn tool_call_result_error() {
        let result = ToolCallResult::error("Something went wrong");
        assert!(result.is_error);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["isError"], true);
    }

    #[test]
    fn render_records_wraps_each_record() {
        let mut record = Record::new();
        record.insert("id".to_string(), json!(1));
        let content = render_records("header".to_string(), vec![record]);
        assert_eq!(
            content,
            [ToolContent::text("header"), ToolContent::text(r#"<r>{"id":1}<r>"#)]
        );
    }

    #[test]
    fn arguments_treat_null_as_absent() {
        let value = json!({"limit": null, "filter_expr": null});
        let args = Arguments(&value);
        assert_eq!(args.u64_or("limit", 5).unwrap(), 5);
        assert!(args.optional_str("filter_expr").unwrap().is_none());
    }

    #[test]
    fn arguments_reject_wrong_types() {
        let value = json!({
            "limit": -3,
            "drop_ratio": "high",
            "output_fields": ["title", 7],
            "collection_name": 12
        });
        let args = Arguments(&value);

        assert!(matches!(
            args.u64_or("limit", 5),
            Err(ToolError::InvalidArgument { name: "limit", .. })
        ));
        assert!(args.f64_or("drop_ratio", 0.2).is_err());
        assert!(args.optional_string_list("output_fields").is_err());
        assert_eq!(
            args.required_str("collection_name").unwrap_err().to_string(),
            "Invalid parameter 'collection_name': expected a string"
        );
    }

    #[test]
    fn arguments_on_null_object() {
        let args = Arguments(&Value::Null);
        assert_eq!(
            args.required_str("collection_name").unwrap_err().to_string(),
            "Missing required parameter: collection_name"
        );
    }
}
