//! Row and value representation for query results.

use std::collections::HashMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// A single column value returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    /// NULL value
    Null,
    /// Integer value
    Integer(i64),
    /// Floating point value
    Float(f64),
    /// Text value
    String(String),
    /// Binary data
    Binary(Vec<u8>),
}

impl SqlValue {
    /// Check if value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Get as string, returning None if null or wrong type.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            SqlValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as i64, returning None if null or wrong type.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64, widening integers.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            SqlValue::Float(f) => Some(*f),
            SqlValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get as bytes, returning None if null or wrong type.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            SqlValue::Binary(b) => Some(b),
            _ => None,
        }
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::String(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::String(s)
    }
}

impl From<i32> for SqlValue {
    fn from(i: i32) -> Self {
        SqlValue::Integer(i as i64)
    }
}

impl From<i64> for SqlValue {
    fn from(i: i64) -> Self {
        SqlValue::Integer(i)
    }
}

impl From<f64> for SqlValue {
    fn from(f: f64) -> Self {
        SqlValue::Float(f)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(b: Vec<u8>) -> Self {
        SqlValue::Binary(b)
    }
}

/// Result row from a query: column names mapped to values, in select-list order.
///
/// Lookup by name is case-insensitive, matching how the source language
/// addresses table fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlRow {
    /// Column names as reported by the backend
    names: Vec<String>,
    /// Column values by index
    columns: Vec<SqlValue>,
    /// Upper-cased column name to index
    index: HashMap<String, usize>,
}

impl SqlRow {
    /// Create a new empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column value.
    ///
    /// A repeated name (e.g. the same field selected from two tables) keeps
    /// both values positionally; name lookup resolves to the first one.
    pub fn add_column(&mut self, name: &str, value: SqlValue) {
        let idx = self.columns.len();
        self.index.entry(name.to_uppercase()).or_insert(idx);
        self.names.push(name.to_string());
        self.columns.push(value);
    }

    /// Builder-style [`add_column`](Self::add_column).
    pub fn with_column(mut self, name: &str, value: impl Into<SqlValue>) -> Self {
        self.add_column(name, value.into());
        self
    }

    /// Get column by index.
    pub fn get(&self, index: usize) -> Option<&SqlValue> {
        self.columns.get(index)
    }

    /// Get column by name.
    pub fn get_by_name(&self, name: &str) -> Option<&SqlValue> {
        self.index
            .get(&name.to_uppercase())
            .and_then(|&idx| self.columns.get(idx))
    }

    /// Column names in select-list order.
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    /// Iterate `(name, value)` pairs in select-list order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.columns.iter())
    }

    /// Get number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if row is empty.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl Serialize for SqlRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
