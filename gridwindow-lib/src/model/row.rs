//! A single row of a windowed result set

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::error::TransportError;

const INDEX_FIELD: &str = "index";

/// A row returned by the server, stamped with its absolute index.
///
/// Rows are opaque field maps: the cache never interprets field values, it
/// only records where in the virtual table the row lives.
///
/// # Example
///
/// ```
/// use gridwindow_lib::model::Row;
///
/// let row = Row::new()
///     .set("id", 42)
///     .set("name", "Contoso");
///
/// assert_eq!(row.get_str("name"), Some("Contoso"));
/// assert_eq!(row.get_i64("id"), Some(42));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Absolute position in the virtual table.
    #[serde(default)]
    pub(crate) index: usize,

    #[serde(flatten)]
    pub(crate) fields: Map<String, Value>,
}

impl Row {
    /// Creates an empty row at index 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a row from a field map.
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self { index: 0, fields }
    }

    /// Converts a JSON value into a row.
    ///
    /// Only JSON objects are valid rows.
    pub fn from_value(value: Value) -> Result<Self, TransportError> {
        match value {
            Value::Object(fields) => Ok(Self::from_fields(fields)),
            other => Err(TransportError::parse(format!(
                "expected row object, found {}",
                json_kind(&other)
            ))),
        }
    }

    /// Returns the absolute index of this row.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Places the row at `index`.
    ///
    /// An `index` field sent by the server is dropped; the absolute index is
    /// the only one a cached row carries.
    pub(crate) fn stamped(mut self, index: usize) -> Self {
        self.fields.remove(INDEX_FIELD);
        self.index = index;
        self
    }

    // =========================================================================
    // Field access
    // =========================================================================

    /// Returns a reference to the field value, if it exists.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Returns `true` if the row contains the given field.
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Returns the field as a string slice, if it is a JSON string.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field)?.as_str()
    }

    /// Returns the field as an integer, if it is a JSON integer.
    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.get(field)?.as_i64()
    }

    /// Returns the field as a float, if it is a JSON number.
    pub fn get_f64(&self, field: &str) -> Option<f64> {
        self.get(field)?.as_f64()
    }

    /// Returns the field as a boolean, if it is a JSON boolean.
    pub fn get_bool(&self, field: &str) -> Option<bool> {
        self.get(field)?.as_bool()
    }

    /// Returns a reference to all fields.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Consumes the row and returns its fields.
    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    /// Sets a field value (builder pattern).
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Inserts a field value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
