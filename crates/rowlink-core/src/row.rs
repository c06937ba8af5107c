//! Owned rows.
//!
//! A `Row` holds copies of the values of one fetched row, so it stays valid
//! after the cursor advances.

use std::fmt;
use std::sync::Arc;

use crate::metadata::ResultMetadata;
use crate::value::Value;

/// A single row of values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    /// Creates a new row with the given values.
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Creates a row with all NULL values.
    pub fn nulls(num_columns: usize) -> Self {
        Self {
            values: vec![Value::Null; num_columns],
        }
    }

    /// Returns the number of columns in this row.
    pub fn num_columns(&self) -> usize {
        self.values.len()
    }

    /// Returns true if this row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the value at the given index.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Returns an iterator over the values.
    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    /// Returns the values as a slice.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Returns the values as a mutable slice, suitable as a fetch target.
    pub fn values_mut(&mut self) -> &mut [Value] {
        &mut self.values
    }

    /// Consumes the row and returns the values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

impl IntoIterator for Row {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, ")")
    }
}

/// A row paired with the metadata of its result set.
#[derive(Debug, Clone)]
pub struct NamedRow {
    /// The row data.
    pub row: Row,
    /// Result set metadata.
    pub metadata: Arc<ResultMetadata>,
}

impl NamedRow {
    /// Creates a new named row.
    pub fn new(row: Row, metadata: Arc<ResultMetadata>) -> Self {
        Self { row, metadata }
    }

    /// Returns the value for a column by name.
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.metadata.index_of(name).and_then(|i| self.row.get(i))
    }

    /// Returns the number of columns.
    pub fn num_columns(&self) -> usize {
        self.row.num_columns()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_get() {
        let row = Row::new(vec![Value::Int(1), Value::text("alice")]);
        assert_eq!(row.num_columns(), 2);
        assert_eq!(row.get(0), Some(&Value::Int(1)));
        assert_eq!(row.get(1).and_then(Value::as_str), Some("alice"));
        assert_eq!(row.get(2), None);
    }

    #[test]
    fn test_row_nulls() {
        let row = Row::nulls(3);
        assert_eq!(row.num_columns(), 3);
        assert!(row.iter().all(Value::is_null));
    }

    #[test]
    fn test_row_values_mut() {
        let mut row = Row::nulls(2);
        row.values_mut()[1] = Value::Float(3.5);
        assert_eq!(row.get(1), Some(&Value::Float(3.5)));
    }

    #[test]
    fn test_row_display() {
        let row = Row::new(vec![Value::Int(2), Value::text("bob"), Value::Null]);
        assert_eq!(row.to_string(), "(2, bob, NULL)");
    }
}
