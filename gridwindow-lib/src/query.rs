//! Query state shared by every fetch of a cache

use serde_json::Map;
use serde_json::Value;

/// The parameters that define row identity and ordering.
///
/// Any change to the search text or sort invalidates every cached position;
/// extra parameters only affect subsequent fetches.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState {
    /// Free-text search applied by the server.
    pub search: String,
    /// Field to sort by, or `None` for the server's natural order.
    pub sort: Option<String>,
    /// Sort direction.
    pub ascending: bool,
    /// Additional parameters merged into every request body.
    pub params: Map<String, Value>,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            search: String::new(),
            sort: None,
            ascending: true,
            params: Map::new(),
        }
    }
}

impl QueryState {
    /// Creates an empty query state (no search, natural order, ascending).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the search text (builder pattern).
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    /// Sets the sort field and direction (builder pattern).
    pub fn with_sort(mut self, field: impl Into<String>, ascending: bool) -> Self {
        self.sort = Some(field.into());
        self.ascending = ascending;
        self
    }

    /// Adds an extra parameter (builder pattern).
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Returns the value of an extra parameter, if set.
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }
}
