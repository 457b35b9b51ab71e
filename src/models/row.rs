//! Result rows and write outcomes returned by drivers.

use crate::models::Value;

/// One result row: column names in select order with their decoded values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column to the row.
    pub fn with_column(mut self, name: impl Into<String>, value: Value) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.columns.push((name.into(), value));
    }

    /// Look up a column by its exact name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

/// Outcome of a driver-level write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecuteResult {
    pub rows_affected: u64,
    /// Generated-key row, present only when keys were requested and the
    /// driver produced them.
    pub generated_keys: Option<Row>,
}

/// Outcome of an INSERT or UPDATE issued through a session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteResult {
    pub rows_affected: u64,
    /// The key written back onto the parameter's key field, if any.
    pub generated_key: Option<Value>,
}
