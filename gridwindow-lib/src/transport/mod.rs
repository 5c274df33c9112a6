//! Fetch transport
//!
//! The cache talks to the server through the [`Transport`] trait. A request
//! names an inclusive window plus the query state; the response carries the
//! rows of that window (possibly fewer), the server's total row count and,
//! when requested, the column descriptors.

mod http;

pub use http::*;

use async_trait::async_trait;
use serde_json::Map;
use serde_json::Value;

use crate::cache::Window;
use crate::error::TransportError;
use crate::model::Row;
use crate::query::QueryState;

/// Backend that serves windows of rows.
///
/// Implementations only move data; windowing, batching and reconciliation
/// happen in the cache.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetches the rows of `request.window`.
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, TransportError>;
}

/// A request for one window of rows.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    /// Rows to fetch (inclusive).
    pub window: Window,
    /// Search text.
    pub search: String,
    /// Sort field, if any.
    pub sort: Option<String>,
    /// Sort direction.
    pub ascending: bool,
    /// Whether column metadata should be included in the response.
    pub load_columns: bool,
    /// Extra parameters.
    pub params: Map<String, Value>,
}

impl FetchRequest {
    /// Creates a request for `window` under the given query state.
    pub fn new(window: Window, query: &QueryState, load_columns: bool) -> Self {
        Self {
            window,
            search: query.search.clone(),
            sort: query.sort.clone(),
            ascending: query.ascending,
            load_columns,
            params: query.params.clone(),
        }
    }

    /// Builds the JSON request body.
    ///
    /// `loadColumns` is only present when columns are wanted. Extra
    /// parameters are written last and take precedence over the fixed keys.
    pub fn to_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("from".into(), Value::from(self.window.from));
        body.insert("to".into(), Value::from(self.window.to));
        body.insert("search".into(), Value::from(self.search.clone()));
        body.insert(
            "sort".into(),
            self.sort.clone().map_or(Value::Null, Value::String),
        );
        body.insert("asc".into(), Value::Bool(self.ascending));
        if self.load_columns {
            body.insert("loadColumns".into(), Value::Bool(true));
        }
        for (key, value) in &self.params {
            body.insert(key.clone(), value.clone());
        }
        Value::Object(body)
    }
}

/// The rows of a fetched window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchResponse {
    /// Rows in window order, starting at `window.from`.
    pub rows: Vec<Row>,
    /// Total rows for the current query state.
    pub total: usize,
    /// Column descriptors, when they were requested and sent.
    pub columns: Option<Vec<Value>>,
}

impl FetchResponse {
    /// Creates a response without column metadata.
    pub fn new(rows: Vec<Row>, total: usize) -> Self {
        Self {
            rows,
            total,
            columns: None,
        }
    }

    /// Attaches column metadata.
    pub fn with_columns(mut self, columns: Vec<Value>) -> Self {
        self.columns = Some(columns);
        self
    }

    /// Parses a response body.
    ///
    /// Expects `data` (array of objects) and `total` (integer, or a string
    /// holding one). Columns are read from `columns_key` when present.
    pub fn from_json(body: Value, columns_key: &str) -> Result<Self, TransportError> {
        let Value::Object(mut body) = body else {
            return Err(TransportError::parse("response is not a JSON object"));
        };

        let rows = match body.remove("data") {
            Some(Value::Array(items)) => items
                .into_iter()
                .map(Row::from_value)
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(TransportError::parse("`data` is not an array")),
            None => return Err(TransportError::parse("missing `data`")),
        };

        let total = match body.get("total") {
            Some(value) => parse_total(value)?,
            None => return Err(TransportError::parse("missing `total`")),
        };

        let columns = match body.remove(columns_key) {
            None | Some(Value::Null) => None,
            Some(Value::Array(columns)) => Some(columns),
            Some(_) => {
                return Err(TransportError::parse(format!(
                    "`{}` is not an array",
                    columns_key
                )));
            }
        };

        Ok(Self {
            rows,
            total,
            columns,
        })
    }
}

fn parse_total(value: &Value) -> Result<usize, TransportError> {
    let total = match value {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<usize>().ok(),
        _ => None,
    };
    total.ok_or_else(|| TransportError::parse(format!("invalid `total`: {}", value)))
}
