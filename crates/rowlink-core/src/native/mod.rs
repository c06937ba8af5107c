//! Native statement interface.
//!
//! Everything the row layer asks of the engine goes through
//! [`NativeStatement`]. The trait mirrors the ODBC statement primitives one
//! to one: out-parameters and raw return codes included, so an
//! implementation over a driver handle stays a thin shim.
//!
//! Two implementations ship with the crate:
//!
//! - [`ScriptedStatement`]: an in-memory engine with ODBC fetch semantics,
//!   used by tests and benches
//! - `OdbcStatement` (feature `odbc`): a borrowed `SQLHSTMT`

mod scripted;

#[cfg(feature = "odbc")]
pub mod odbc;

pub use scripted::{CallLog, Cell, NativeCall, ScriptedStatement};

use std::fmt;

use rowlink_common::error::{DiagnosticRecord, OdbcError, OdbcResult};
use rowlink_common::memory::ColumnBuffer;

use crate::catalog::CType;

/// Native operation names used in errors.
pub mod ops {
    /// `SQLNumResultCols`
    pub const NUM_RESULT_COLS: &str = "SQLNumResultCols";
    /// `SQLDescribeCol`
    pub const DESCRIBE_COL: &str = "SQLDescribeCol";
    /// `SQLBindCol`
    pub const BIND_COL: &str = "SQLBindCol";
    /// `SQLFetch`
    pub const FETCH: &str = "SQLFetch";
    /// `SQLGetData`
    pub const GET_DATA: &str = "SQLGetData";
    /// `SQLFreeStmt(SQL_UNBIND)`
    pub const UNBIND: &str = "SQLFreeStmt(SQL_UNBIND)";
    /// `SQLFreeStmt(SQL_CLOSE)`
    pub const CLOSE_CURSOR: &str = "SQLFreeStmt(SQL_CLOSE)";
}

/// Return code of a native call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlReturn {
    /// `SQL_SUCCESS`
    Success,
    /// `SQL_SUCCESS_WITH_INFO`: diagnostics are available.
    SuccessWithInfo,
    /// `SQL_NO_DATA`
    NoData,
    /// `SQL_NEED_DATA`
    NeedData,
    /// `SQL_STILL_EXECUTING`
    StillExecuting,
    /// `SQL_ERROR`
    Error,
    /// `SQL_INVALID_HANDLE`
    InvalidHandle,
}

impl SqlReturn {
    /// Interprets a raw `SQLRETURN`. Undefined codes map to `Error`.
    #[must_use]
    pub const fn from_raw(raw: i16) -> Self {
        match raw {
            0 => SqlReturn::Success,
            1 => SqlReturn::SuccessWithInfo,
            100 => SqlReturn::NoData,
            99 => SqlReturn::NeedData,
            2 => SqlReturn::StillExecuting,
            -2 => SqlReturn::InvalidHandle,
            _ => SqlReturn::Error,
        }
    }

    /// Returns the raw `SQLRETURN`.
    #[must_use]
    pub const fn raw(self) -> i16 {
        match self {
            SqlReturn::Success => 0,
            SqlReturn::SuccessWithInfo => 1,
            SqlReturn::NoData => 100,
            SqlReturn::NeedData => 99,
            SqlReturn::StillExecuting => 2,
            SqlReturn::Error => -1,
            SqlReturn::InvalidHandle => -2,
        }
    }

    /// Returns true for `Success` and `SuccessWithInfo`.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, SqlReturn::Success | SqlReturn::SuccessWithInfo)
    }

    /// Returns true for `Error` and `InvalidHandle`.
    #[must_use]
    pub const fn is_error(self) -> bool {
        matches!(self, SqlReturn::Error | SqlReturn::InvalidHandle)
    }
}

impl fmt::Display for SqlReturn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SqlReturn::Success => "SQL_SUCCESS",
            SqlReturn::SuccessWithInfo => "SQL_SUCCESS_WITH_INFO",
            SqlReturn::NoData => "SQL_NO_DATA",
            SqlReturn::NeedData => "SQL_NEED_DATA",
            SqlReturn::StillExecuting => "SQL_STILL_EXECUTING",
            SqlReturn::Error => "SQL_ERROR",
            SqlReturn::InvalidHandle => "SQL_INVALID_HANDLE",
        };
        f.write_str(name)
    }
}

/// A native SQL data type code (`SQL_*`), as reported by `SQLDescribeCol`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SqlDataType(pub i16);

impl SqlDataType {
    /// `SQL_UNKNOWN_TYPE`
    pub const UNKNOWN: SqlDataType = SqlDataType(0);
    /// `SQL_CHAR`
    pub const CHAR: SqlDataType = SqlDataType(1);
    /// `SQL_NUMERIC`
    pub const NUMERIC: SqlDataType = SqlDataType(2);
    /// `SQL_DECIMAL`
    pub const DECIMAL: SqlDataType = SqlDataType(3);
    /// `SQL_INTEGER`
    pub const INTEGER: SqlDataType = SqlDataType(4);
    /// `SQL_SMALLINT`
    pub const SMALLINT: SqlDataType = SqlDataType(5);
    /// `SQL_FLOAT`
    pub const FLOAT: SqlDataType = SqlDataType(6);
    /// `SQL_REAL`
    pub const REAL: SqlDataType = SqlDataType(7);
    /// `SQL_DOUBLE`
    pub const DOUBLE: SqlDataType = SqlDataType(8);
    /// `SQL_DATETIME`
    pub const DATETIME: SqlDataType = SqlDataType(9);
    /// `SQL_VARCHAR`
    pub const VARCHAR: SqlDataType = SqlDataType(12);
    /// `SQL_TYPE_DATE`
    pub const TYPE_DATE: SqlDataType = SqlDataType(91);
    /// `SQL_TYPE_TIME`
    pub const TYPE_TIME: SqlDataType = SqlDataType(92);
    /// `SQL_TYPE_TIMESTAMP`
    pub const TYPE_TIMESTAMP: SqlDataType = SqlDataType(93);
    /// `SQL_LONGVARCHAR`
    pub const LONGVARCHAR: SqlDataType = SqlDataType(-1);
    /// `SQL_BINARY`
    pub const BINARY: SqlDataType = SqlDataType(-2);
    /// `SQL_VARBINARY`
    pub const VARBINARY: SqlDataType = SqlDataType(-3);
    /// `SQL_LONGVARBINARY`
    pub const LONGVARBINARY: SqlDataType = SqlDataType(-4);
    /// `SQL_BIGINT`
    pub const BIGINT: SqlDataType = SqlDataType(-5);
    /// `SQL_TINYINT`
    pub const TINYINT: SqlDataType = SqlDataType(-6);
    /// `SQL_BIT`
    pub const BIT: SqlDataType = SqlDataType(-7);
    /// `SQL_WCHAR`
    pub const WCHAR: SqlDataType = SqlDataType(-8);
    /// `SQL_WVARCHAR`
    pub const WVARCHAR: SqlDataType = SqlDataType(-9);
    /// `SQL_WLONGVARCHAR`
    pub const WLONGVARCHAR: SqlDataType = SqlDataType(-10);
    /// `SQL_GUID`
    pub const GUID: SqlDataType = SqlDataType(-11);
    /// `SQL_SS_XML` (SQL Server extension)
    pub const SS_XML: SqlDataType = SqlDataType(-152);
}

/// Whether a column admits NULL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Nullability {
    /// `SQL_NO_NULLS`
    NoNulls,
    /// `SQL_NULLABLE`
    Nullable,
    /// `SQL_NULLABLE_UNKNOWN`
    #[default]
    Unknown,
}

/// Column shape reported by `SQLDescribeCol`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnDescription {
    /// Column name, possibly empty.
    pub name: String,
    /// SQL data type.
    pub data_type: SqlDataType,
    /// Declared size: characters for text, bytes for binary, zero if unknown.
    pub column_size: usize,
    /// Scale for exact numerics.
    pub decimal_digits: i16,
    /// Nullability.
    pub nullable: Nullability,
}

impl Default for SqlDataType {
    fn default() -> Self {
        SqlDataType::UNKNOWN
    }
}

impl ColumnDescription {
    /// Creates a description with unknown nullability.
    pub fn new(name: impl Into<String>, data_type: SqlDataType, column_size: usize) -> Self {
        Self {
            name: name.into(),
            data_type,
            column_size,
            decimal_digits: 0,
            nullable: Nullability::Unknown,
        }
    }

    /// Sets the nullability.
    #[must_use]
    pub fn with_nullable(mut self, nullable: Nullability) -> Self {
        self.nullable = nullable;
        self
    }
}

/// An executed statement with an open cursor.
///
/// Column numbers are one-based, as in ODBC. Each method returns the raw
/// outcome of the call; diagnostics for the most recent call are retrieved
/// with [`NativeStatement::diagnostics`].
pub trait NativeStatement {
    /// `SQLNumResultCols`: writes the number of result columns.
    fn num_result_cols(&mut self, count: &mut u16) -> SqlReturn;

    /// `SQLDescribeCol`: describes one result column.
    fn describe_col(&mut self, column_number: u16, description: &mut ColumnDescription)
        -> SqlReturn;

    /// `SQLBindCol`: registers `buffer` to receive the column on every fetch.
    ///
    /// # Safety
    ///
    /// The engine keeps the buffer and indicator addresses. The caller must
    /// keep `buffer` alive and unmoved in memory until [`unbind_cols`] or
    /// [`close_cursor`] returns, and must not read it concurrently with a
    /// fetch.
    ///
    /// [`unbind_cols`]: NativeStatement::unbind_cols
    /// [`close_cursor`]: NativeStatement::close_cursor
    unsafe fn bind_col(
        &mut self,
        column_number: u16,
        c_type: CType,
        buffer: &mut ColumnBuffer,
    ) -> SqlReturn;

    /// `SQLFetch`: advances the cursor and fills bound buffers.
    fn fetch(&mut self) -> SqlReturn;

    /// `SQLGetData`: copies the next chunk of a column of the current row.
    ///
    /// Returns `SuccessWithInfo` with SQLSTATE `01004` while more data
    /// remains, and `NoData` once the value has been fully returned.
    fn get_data(&mut self, column_number: u16, c_type: CType, buffer: &mut ColumnBuffer)
        -> SqlReturn;

    /// `SQLFreeStmt(SQL_UNBIND)`: releases all column bindings.
    fn unbind_cols(&mut self) -> SqlReturn;

    /// `SQLFreeStmt(SQL_CLOSE)`: closes the cursor.
    fn close_cursor(&mut self) -> SqlReturn;

    /// `SQLGetDiagRec`: diagnostic records for the most recent call.
    fn diagnostics(&mut self) -> Vec<DiagnosticRecord>;
}

/// Converts a failed return code into an error carrying the statement's
/// diagnostics. Successful codes and `NoData` pass through.
pub(crate) fn check<S>(stmt: &mut S, operation: &'static str, ret: SqlReturn) -> OdbcResult<SqlReturn>
where
    S: NativeStatement + ?Sized,
{
    match ret {
        SqlReturn::Success | SqlReturn::SuccessWithInfo | SqlReturn::NoData => Ok(ret),
        other => Err(failure(stmt, operation, other)),
    }
}

/// Builds the error for a failed call.
pub(crate) fn failure<S>(stmt: &mut S, operation: &'static str, ret: SqlReturn) -> OdbcError
where
    S: NativeStatement + ?Sized,
{
    let mut records = match ret {
        SqlReturn::InvalidHandle => Vec::new(),
        _ => stmt.diagnostics(),
    };
    if records.is_empty() {
        records.push(DiagnosticRecord::general(format!("{operation} returned {ret}")));
    }
    OdbcError::native(operation, records)
}
