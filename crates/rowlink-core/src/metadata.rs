//! Result set metadata.

use rowlink_common::error::{OdbcError, OdbcResult};

use crate::catalog::{classify, CType, ValueKind};
use crate::column::Column;

/// Per-column type information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    /// C type the column is read as.
    pub c_type: CType,
    /// Value kind to scan into.
    pub kind: ValueKind,
    /// Catalog name, empty if unrecognized.
    pub type_name: &'static str,
}

/// Names and types of a result set, captured once when the cursor opens.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultMetadata {
    names: Vec<String>,
    columns: Vec<ColumnInfo>,
}

impl ResultMetadata {
    /// Captures metadata from column descriptors.
    pub fn from_columns(columns: &[Column]) -> Self {
        let names = columns.iter().map(|c| c.name().to_string()).collect();
        let columns = columns
            .iter()
            .map(|c| {
                let entry = classify(c.c_type());
                ColumnInfo {
                    c_type: c.c_type(),
                    kind: entry.kind,
                    type_name: entry.name,
                }
            })
            .collect();
        Self { names, columns }
    }

    /// Returns the column names in ordinal order.
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    /// Returns the number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns the type information of column `index`.
    ///
    /// # Errors
    ///
    /// Returns `ColumnIndexOutOfRange` if `index` is not a column.
    pub fn column(&self, index: usize) -> OdbcResult<&ColumnInfo> {
        self.columns
            .get(index)
            .ok_or(OdbcError::ColumnIndexOutOfRange {
                index,
                count: self.columns.len(),
            })
    }

    /// Returns the value kind of column `index`.
    ///
    /// # Errors
    ///
    /// Returns `ColumnIndexOutOfRange` if `index` is not a column.
    pub fn scan_value_kind(&self, index: usize) -> OdbcResult<ValueKind> {
        Ok(self.column(index)?.kind)
    }

    /// Returns the catalog type name of column `index`.
    ///
    /// # Errors
    ///
    /// Returns `ColumnIndexOutOfRange` if `index` is not a column.
    pub fn database_type_name(&self, index: usize) -> OdbcResult<&'static str> {
        Ok(self.column(index)?.type_name)
    }

    /// Returns the C type of column `index`.
    ///
    /// # Errors
    ///
    /// Returns `ColumnIndexOutOfRange` if `index` is not a column.
    pub fn c_type(&self, index: usize) -> OdbcResult<CType> {
        Ok(self.column(index)?.c_type)
    }

    /// Returns the index of the first column named `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowlink_common::config::FetchConfig;

    fn metadata() -> ResultMetadata {
        let config = FetchConfig::default();
        ResultMetadata::from_columns(&[
            Column::for_type("id", 0, CType::LONG, &config),
            Column::for_type("name", 1, CType::CHAR, &config),
            Column::for_type("odd", 2, CType(500), &config),
        ])
    }

    #[test]
    fn test_names_and_kinds() {
        let meta = metadata();
        assert_eq!(meta.column_count(), 3);
        assert_eq!(meta.column_names(), ["id", "name", "odd"]);
        assert_eq!(meta.scan_value_kind(0).unwrap(), ValueKind::NullableInt64);
        assert_eq!(meta.database_type_name(1).unwrap(), "SQL_C_CHAR");
        assert_eq!(meta.database_type_name(2).unwrap(), "");
        assert_eq!(meta.scan_value_kind(2).unwrap(), ValueKind::Unknown);
        assert_eq!(meta.c_type(1).unwrap(), CType::CHAR);
        assert_eq!(meta.index_of("name"), Some(1));
        assert_eq!(meta.index_of("missing"), None);
    }

    #[test]
    fn test_out_of_range() {
        let meta = metadata();
        assert!(matches!(
            meta.scan_value_kind(3),
            Err(OdbcError::ColumnIndexOutOfRange { index: 3, count: 3 })
        ));
        assert!(meta.database_type_name(99).is_err());
    }
}
