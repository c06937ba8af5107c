//! Row cursor.
//!
//! [`Rows`] drives an executed statement: it fetches one row at a time and
//! materializes every column into a caller-supplied row buffer.
//!
//! # Example
//!
//! ```rust
//! use rowlink_common::config::FetchConfig;
//! use rowlink_core::native::{Cell, ColumnDescription, ScriptedStatement, SqlDataType};
//! use rowlink_core::rows::{FetchStatus, Rows};
//! use rowlink_core::value::Value;
//!
//! # fn main() -> rowlink_common::error::OdbcResult<()> {
//! let mut stmt = ScriptedStatement::new(vec![
//!     ColumnDescription::new("id", SqlDataType::INTEGER, 10),
//!     ColumnDescription::new("name", SqlDataType::VARCHAR, 32),
//! ])
//! .with_row(vec![Cell::long(1), Cell::text("alice")]);
//!
//! let mut rows = Rows::open(&mut stmt, FetchConfig::default())?;
//! let mut row = vec![Value::Null; rows.column_count()];
//!
//! while rows.next(&mut row)? == FetchStatus::Row {
//!     assert_eq!(row[0], Value::Int(1));
//!     assert_eq!(row[1].as_str(), Some("alice"));
//! }
//! rows.close()?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use rowlink_common::config::FetchConfig;
use rowlink_common::error::{OdbcError, OdbcResult};
use tracing::{debug, trace, warn};

use crate::catalog::ValueKind;
use crate::column::Column;
use crate::describe::describe_result_set;
use crate::metadata::ResultMetadata;
use crate::native::{self, ops, NativeStatement, SqlReturn};
use crate::row::{NamedRow, Row};
use crate::value::Value;

/// Outcome of advancing the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// A row was written to the buffer.
    Row,
    /// No more rows.
    EndOfData,
}

/// Lifecycle of the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Rows may remain.
    Open,
    /// End of data was reached.
    Exhausted,
    /// A fetch or extraction failed.
    Poisoned,
    /// Closed.
    Closed,
}

/// A forward-only cursor over an executed statement.
///
/// Holds the statement exclusively for its lifetime. Values are copied out
/// of the native buffers, so rows delivered by [`Rows::next`] remain valid
/// after the cursor advances.
pub struct Rows<'s, S: NativeStatement + ?Sized> {
    stmt: &'s mut S,
    columns: Vec<Column>,
    metadata: Arc<ResultMetadata>,
    state: CursorState,
    rows_fetched: u64,
}

impl<'s, S: NativeStatement + ?Sized> Rows<'s, S> {
    /// Describes the result set of `stmt` and opens a cursor over it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `config` does not validate, and any error
    /// from describing the result set or binding columns.
    pub fn open(stmt: &'s mut S, config: FetchConfig) -> OdbcResult<Self> {
        config.validate()?;
        let columns = describe_result_set(stmt, &config)?;
        Self::new(stmt, columns, config)
    }

    /// Opens a cursor with caller-built column descriptors.
    ///
    /// `columns[i]` must describe result column `i`. Bindable columns that
    /// form a prefix of the result set are registered with the engine; the
    /// rest are read explicitly.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `config` does not validate or the column
    /// ordinals are not `0..n`, and a `Native` error if binding fails.
    pub fn new(stmt: &'s mut S, columns: Vec<Column>, config: FetchConfig) -> OdbcResult<Self> {
        config.validate()?;
        if let Some((i, c)) = columns
            .iter()
            .enumerate()
            .find(|(i, c)| usize::from(c.ordinal()) != *i)
        {
            return Err(OdbcError::invalid_config(format!(
                "column '{}' at position {} has ordinal {}",
                c.name(),
                i,
                c.ordinal()
            )));
        }

        let metadata = Arc::new(ResultMetadata::from_columns(&columns));
        let mut rows = Self {
            stmt,
            columns,
            metadata,
            state: CursorState::Open,
            rows_fetched: 0,
        };

        if config.bind_columns {
            rows.bind_prefix()?;
        }

        debug!(
            "Opened cursor with {} columns ({} bound)",
            rows.columns.len(),
            rows.columns.iter().filter(|c| c.is_bound()).count()
        );
        Ok(rows)
    }

    /// Binds bindable columns up to the first non-bindable one.
    fn bind_prefix(&mut self) -> OdbcResult<()> {
        for i in 0..self.columns.len() {
            if !self.columns[i].is_bindable() {
                break;
            }
            if let Err(e) = self.columns[i].bind(&mut *self.stmt) {
                // Release bindings made so far; the bind error is what matters.
                let _ = self.unbind_all();
                self.state = CursorState::Poisoned;
                return Err(e);
            }
        }
        Ok(())
    }

    fn unbind_all(&mut self) -> OdbcResult<()> {
        if !self.columns.iter().any(Column::is_bound) {
            return Ok(());
        }
        let ret = self.stmt.unbind_cols();
        native::check(&mut *self.stmt, ops::UNBIND, ret)?;
        for column in &mut self.columns {
            column.mark_unbound();
        }
        Ok(())
    }

    /// Returns the column names in ordinal order.
    pub fn column_names(&self) -> &[String] {
        self.metadata.column_names()
    }

    /// Returns the number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns the value kind of column `index`.
    ///
    /// # Errors
    ///
    /// Returns `ColumnIndexOutOfRange` if `index` is not a column.
    pub fn scan_value_kind(&self, index: usize) -> OdbcResult<ValueKind> {
        self.metadata.scan_value_kind(index)
    }

    /// Returns the catalog type name of column `index`, empty if the type
    /// is not recognized.
    ///
    /// # Errors
    ///
    /// Returns `ColumnIndexOutOfRange` if `index` is not a column.
    pub fn database_type_name(&self, index: usize) -> OdbcResult<&'static str> {
        self.metadata.database_type_name(index)
    }

    /// Returns the result set metadata.
    pub fn metadata(&self) -> &Arc<ResultMetadata> {
        &self.metadata
    }

    /// Returns the column descriptors.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns the cursor state.
    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Returns the number of rows delivered so far.
    pub fn rows_fetched(&self) -> u64 {
        self.rows_fetched
    }

    /// Advances to the next row and writes its values into `dest`.
    ///
    /// Columns are extracted in ascending ordinal order, every column on
    /// every row. After `EndOfData` further calls return `EndOfData` without
    /// touching the engine.
    ///
    /// # Errors
    ///
    /// - `ColumnCountMismatch` if `dest` does not have one slot per column;
    ///   nothing is fetched
    /// - `Native` if the fetch or a column read fails
    /// - any column extraction error
    /// - `CursorUnusable` after an earlier failure, `CursorClosed` after
    ///   [`Rows::close`]
    ///
    /// A fetch or extraction failure leaves the cursor unusable and the
    /// contents of `dest` unspecified.
    pub fn next(&mut self, dest: &mut [Value]) -> OdbcResult<FetchStatus> {
        match self.state {
            CursorState::Open => {}
            CursorState::Exhausted => return Ok(FetchStatus::EndOfData),
            CursorState::Poisoned => return Err(OdbcError::CursorUnusable),
            CursorState::Closed => return Err(OdbcError::CursorClosed),
        }

        if dest.len() != self.columns.len() {
            return Err(OdbcError::ColumnCountMismatch {
                expected: self.columns.len(),
                actual: dest.len(),
            });
        }

        let ret = self.stmt.fetch();
        match ret {
            SqlReturn::Success | SqlReturn::SuccessWithInfo => {}
            SqlReturn::NoData => {
                self.state = CursorState::Exhausted;
                debug!("End of data after {} rows", self.rows_fetched);
                return Ok(FetchStatus::EndOfData);
            }
            other => {
                self.state = CursorState::Poisoned;
                let err = native::failure(&mut *self.stmt, ops::FETCH, other);
                warn!("Fetch failed, cursor unusable: {}", err);
                return Err(err);
            }
        }

        for (column, slot) in self.columns.iter_mut().zip(dest.iter_mut()) {
            match column.extract_value(&mut *self.stmt) {
                Ok(value) => *slot = value,
                Err(e) => {
                    self.state = CursorState::Poisoned;
                    warn!("Column {} extraction failed, cursor unusable: {}", column.ordinal(), e);
                    return Err(e);
                }
            }
        }

        self.rows_fetched += 1;
        trace!("Fetched row {}", self.rows_fetched);
        Ok(FetchStatus::Row)
    }

    /// Fetches the next row into a newly allocated [`Row`].
    ///
    /// # Errors
    ///
    /// Same as [`Rows::next`].
    pub fn fetch_row(&mut self) -> OdbcResult<Option<Row>> {
        let mut row = Row::nulls(self.columns.len());
        match self.next(row.values_mut())? {
            FetchStatus::Row => Ok(Some(row)),
            FetchStatus::EndOfData => Ok(None),
        }
    }

    /// Fetches the next row paired with the result set metadata, for
    /// access by column name.
    ///
    /// # Errors
    ///
    /// Same as [`Rows::next`].
    pub fn fetch_named(&mut self) -> OdbcResult<Option<NamedRow>> {
        Ok(self
            .fetch_row()?
            .map(|row| NamedRow::new(row, Arc::clone(&self.metadata))))
    }

    /// Returns an iterator over the remaining rows.
    pub fn iter(&mut self) -> RowIter<'_, 's, S> {
        RowIter { rows: self }
    }

    /// Releases column bindings and closes the native cursor.
    ///
    /// Calling `close` again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns a `Native` error if unbinding or closing fails. The cursor
    /// is considered closed either way. Columns that could not be unbound
    /// stay [`Bound`](crate::column::ColumnState::Bound) and keep their buffers until the cursor
    /// is dropped.
    pub fn close(&mut self) -> OdbcResult<()> {
        if self.state == CursorState::Closed {
            return Ok(());
        }
        self.state = CursorState::Closed;

        let unbound = self.unbind_all();

        let ret = self.stmt.close_cursor();
        let closed = native::check(&mut *self.stmt, ops::CLOSE_CURSOR, ret).map(|_| ());

        // Columns still bound after a failed unbind keep their buffers; the
        // engine may write into them. They are leaked on drop.
        for column in self.columns.iter_mut().filter(|c| !c.is_bound()) {
            column.close();
        }

        debug!("Closed cursor after {} rows", self.rows_fetched);
        unbound.and(closed)
    }
}

impl<S: NativeStatement + ?Sized> Drop for Rows<'_, S> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Error closing cursor: {}", e);
        }
        for column in std::mem::take(&mut self.columns) {
            if column.is_bound() {
                warn!("Leaking buffer of column {} still bound to the statement", column.ordinal());
                std::mem::forget(column);
            }
        }
    }
}

impl<S: NativeStatement + ?Sized> std::fmt::Debug for Rows<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rows")
            .field("columns", &self.columns)
            .field("state", &self.state)
            .field("rows_fetched", &self.rows_fetched)
            .finish()
    }
}

/// Iterator over the remaining rows of a cursor.
///
/// Stops after the first error.
pub struct RowIter<'r, 's, S: NativeStatement + ?Sized> {
    rows: &'r mut Rows<'s, S>,
}

impl<S: NativeStatement + ?Sized> Iterator for RowIter<'_, '_, S> {
    type Item = OdbcResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rows.state == CursorState::Poisoned {
            return None;
        }
        self.rows.fetch_row().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CType;
    use crate::native::{Cell, ColumnDescription, NativeCall, ScriptedStatement, SqlDataType};
    use rowlink_common::error::DiagnosticRecord;

    fn two_rows() -> ScriptedStatement {
        ScriptedStatement::new(vec![
            ColumnDescription::new("id", SqlDataType::INTEGER, 10),
            ColumnDescription::new("name", SqlDataType::VARCHAR, 16),
        ])
        .with_rows(vec![
            vec![Cell::long(1), Cell::text("alice")],
            vec![Cell::long(2), Cell::text("bob")],
        ])
    }

    #[test]
    fn test_open_binds_prefix() {
        let mut stmt = two_rows();
        let log = stmt.call_log();
        let rows = Rows::open(&mut stmt, FetchConfig::default()).unwrap();

        assert_eq!(rows.column_names(), ["id", "name"]);
        assert!(rows.columns().iter().all(Column::is_bound));
        assert_eq!(log.count(NativeCall::BindCol(1)), 1);
        assert_eq!(log.count(NativeCall::BindCol(2)), 1);
    }

    #[test]
    fn test_bind_columns_disabled() {
        let mut stmt = two_rows();
        let log = stmt.call_log();
        let config = FetchConfig::builder().bind_columns(false).build();
        let mut rows = Rows::open(&mut stmt, config).unwrap();

        let row = rows.fetch_row().unwrap().unwrap();
        assert_eq!(row.get(0), Some(&Value::Int(1)));
        assert_eq!(row.get(1).and_then(Value::as_str), Some("alice"));
        assert_eq!(log.count(NativeCall::BindCol(1)), 0);
        assert_eq!(log.get_data_columns(), vec![1, 2]);
    }

    #[test]
    fn test_mismatched_buffer_is_rejected_before_fetch() {
        let mut stmt = two_rows();
        let log = stmt.call_log();
        let mut rows = Rows::open(&mut stmt, FetchConfig::default()).unwrap();

        let mut dest = vec![Value::Null; 3];
        assert!(matches!(
            rows.next(&mut dest),
            Err(OdbcError::ColumnCountMismatch {
                expected: 2,
                actual: 3
            })
        ));
        assert_eq!(log.count(NativeCall::Fetch), 0);
        assert_eq!(rows.state(), CursorState::Open);
    }

    #[test]
    fn test_fetch_error_poisons() {
        let mut stmt = two_rows().fail_on(
            NativeCall::Fetch,
            DiagnosticRecord::new("08S01", 10054, "Communication link failure"),
        );
        let log = stmt.call_log();
        let mut rows = Rows::open(&mut stmt, FetchConfig::default()).unwrap();
        let mut dest = vec![Value::Null; 2];

        let err = rows.next(&mut dest).unwrap_err();
        assert_eq!(err.operation(), Some("SQLFetch"));
        assert_eq!(err.native_code(), Some(10054));
        assert_eq!(rows.state(), CursorState::Poisoned);

        assert!(matches!(rows.next(&mut dest), Err(OdbcError::CursorUnusable)));
        assert_eq!(log.count(NativeCall::Fetch), 1);
    }

    #[test]
    fn test_extraction_error_poisons() {
        let mut stmt = ScriptedStatement::new(vec![ColumnDescription::new(
            "body",
            SqlDataType::LONGVARCHAR,
            0,
        )])
        .with_row(vec![Cell::text("abc")])
        .fail_on(NativeCall::GetData(1), DiagnosticRecord::general("boom"));
        let mut rows = Rows::open(&mut stmt, FetchConfig::default()).unwrap();

        assert!(rows.fetch_row().is_err());
        assert_eq!(rows.state(), CursorState::Poisoned);
        assert!(rows.iter().next().is_none());
    }

    #[test]
    fn test_bind_failure_unbinds() {
        let mut stmt = two_rows().fail_on(
            NativeCall::BindCol(2),
            DiagnosticRecord::new("HY003", 0, "Invalid application buffer type"),
        );
        let log = stmt.call_log();

        let err = Rows::open(&mut stmt, FetchConfig::default()).unwrap_err();
        assert_eq!(err.operation(), Some("SQLBindCol"));
        assert_eq!(log.count(NativeCall::UnbindCols), 1);
        assert!(!stmt.is_bound(1));
    }

    #[test]
    fn test_invalid_ordinals() {
        let mut stmt = two_rows();
        let config = FetchConfig::default();
        let columns = vec![
            Column::for_type("id", 1, CType::LONG, &config),
            Column::for_type("name", 0, CType::CHAR, &config),
        ];
        let err = Rows::new(&mut stmt, columns, config).unwrap_err();
        assert!(matches!(err, OdbcError::InvalidConfig { .. }));
    }

    #[test]
    fn test_invalid_config() {
        let mut stmt = two_rows();
        let config = FetchConfig::builder().chunk_size(1).build();
        assert!(matches!(
            Rows::open(&mut stmt, config),
            Err(OdbcError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_iter_collects_rows() {
        let mut stmt = two_rows();
        let mut rows = Rows::open(&mut stmt, FetchConfig::default()).unwrap();
        let collected: Vec<Row> = rows.iter().collect::<OdbcResult<_>>().unwrap();

        assert_eq!(collected.len(), 2);
        assert_eq!(collected[1].to_string(), "(2, bob)");
        assert_eq!(rows.rows_fetched(), 2);
    }

    #[test]
    fn test_fetch_named() {
        let mut stmt = two_rows();
        let mut rows = Rows::open(&mut stmt, FetchConfig::default()).unwrap();

        let named = rows.fetch_named().unwrap().unwrap();
        assert_eq!(named.num_columns(), 2);
        assert_eq!(named.get_by_name("name").and_then(Value::as_str), Some("alice"));
        assert_eq!(named.get_by_name("missing"), None);
    }

    #[test]
    fn test_close_keeps_columns_when_unbind_fails() {
        let mut stmt = two_rows().fail_on(
            NativeCall::UnbindCols,
            DiagnosticRecord::new("HY000", 0, "General error"),
        );
        let log = stmt.call_log();
        let mut rows = Rows::open(&mut stmt, FetchConfig::default()).unwrap();

        let err = rows.close().unwrap_err();
        assert_eq!(err.operation(), Some("SQLFreeStmt(SQL_UNBIND)"));
        assert_eq!(rows.state(), CursorState::Closed);
        assert_eq!(rows.column_count(), 2);
        assert_eq!(rows.column_names().len(), 2);
        assert!(rows.columns().iter().all(Column::is_bound));
        assert_eq!(log.count(NativeCall::CloseCursor), 1);

        assert!(rows.close().is_ok());
        drop(rows);
        assert_eq!(log.count(NativeCall::UnbindCols), 1);
    }

    #[test]
    fn test_drop_closes_cursor() {
        let mut stmt = two_rows();
        let log = stmt.call_log();
        {
            let _rows = Rows::open(&mut stmt, FetchConfig::default()).unwrap();
        }
        assert_eq!(log.count(NativeCall::UnbindCols), 1);
        assert_eq!(log.count(NativeCall::CloseCursor), 1);
        assert!(!stmt.is_open());
    }
}
