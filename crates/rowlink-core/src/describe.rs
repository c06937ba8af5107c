//! Result set description.
//!
//! Turns the engine's column descriptions into column descriptors: which C
//! type each column is read as, and whether it gets a bound buffer.

use rowlink_common::config::FetchConfig;
use rowlink_common::error::{OdbcError, OdbcResult};
use tracing::debug;

use crate::catalog::CType;
use crate::column::Column;
use crate::native::{self, ops, ColumnDescription, NativeStatement, SqlDataType};

/// How a SQL type is transferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    /// Fixed-width C type, always bindable.
    Fixed(CType),
    /// Variable-width, bindable when the declared size is small enough.
    Variable(CType),
    /// Long data, always read in chunks.
    Long(CType),
}

impl Transfer {
    /// Returns the C type.
    pub fn c_type(self) -> CType {
        match self {
            Transfer::Fixed(c) | Transfer::Variable(c) | Transfer::Long(c) => c,
        }
    }
}

/// Maps a SQL data type to its transfer, `None` if unsupported.
pub fn transfer_for(data_type: SqlDataType) -> Option<Transfer> {
    let transfer = match data_type {
        SqlDataType::BIT => Transfer::Fixed(CType::BIT),
        SqlDataType::TINYINT | SqlDataType::SMALLINT | SqlDataType::INTEGER => {
            Transfer::Fixed(CType::LONG)
        }
        SqlDataType::BIGINT => Transfer::Fixed(CType::SBIGINT),
        SqlDataType::NUMERIC
        | SqlDataType::DECIMAL
        | SqlDataType::FLOAT
        | SqlDataType::REAL
        | SqlDataType::DOUBLE => Transfer::Fixed(CType::DOUBLE),
        SqlDataType::TYPE_TIMESTAMP | SqlDataType::DATETIME => {
            Transfer::Fixed(CType::TYPE_TIMESTAMP)
        }
        SqlDataType::TYPE_DATE => Transfer::Fixed(CType::DATE),
        SqlDataType::TYPE_TIME => Transfer::Fixed(CType::TIME),
        SqlDataType::GUID => Transfer::Fixed(CType::GUID),
        SqlDataType::CHAR | SqlDataType::VARCHAR => Transfer::Variable(CType::CHAR),
        SqlDataType::WCHAR | SqlDataType::WVARCHAR => Transfer::Variable(CType::WCHAR),
        SqlDataType::BINARY | SqlDataType::VARBINARY => Transfer::Variable(CType::BINARY),
        SqlDataType::LONGVARCHAR => Transfer::Long(CType::CHAR),
        SqlDataType::WLONGVARCHAR | SqlDataType::SS_XML => Transfer::Long(CType::WCHAR),
        SqlDataType::LONGVARBINARY => Transfer::Long(CType::BINARY),
        _ => return None,
    };
    Some(transfer)
}

/// Buffer size for a variable-width column of `size` declared units.
fn variable_capacity(c_type: CType, size: usize) -> usize {
    match c_type {
        CType::WCHAR => (size + 1) * 2,
        CType::CHAR => size + 1,
        _ => size,
    }
}

/// Builds the descriptor for one described column.
///
/// # Errors
///
/// Returns `UnsupportedColumnType` for SQL types with no mapping.
pub fn column_for(
    ordinal: u16,
    description: &ColumnDescription,
    config: &FetchConfig,
) -> OdbcResult<Column> {
    let transfer = transfer_for(description.data_type).ok_or(OdbcError::UnsupportedColumnType {
        column: ordinal,
        sql_type: description.data_type.0,
    })?;
    let name = description.name.clone();

    let column = match transfer {
        Transfer::Fixed(c_type) => Column::for_type(name, ordinal, c_type, config),
        Transfer::Variable(c_type)
            if description.column_size > 0
                && description.column_size <= config.max_bindable_width =>
        {
            let capacity = variable_capacity(c_type, description.column_size);
            Column::bindable(name, ordinal, c_type, capacity)
        }
        Transfer::Variable(c_type) | Transfer::Long(c_type) => {
            Column::non_bindable(name, ordinal, c_type, config)
        }
    };

    Ok(column)
}

/// Describes the open result set of `stmt` and builds its descriptors.
///
/// # Errors
///
/// Returns a `Native` error if `SQLNumResultCols` or `SQLDescribeCol`
/// fails, and `UnsupportedColumnType` if a column cannot be mapped.
pub fn describe_result_set<S>(stmt: &mut S, config: &FetchConfig) -> OdbcResult<Vec<Column>>
where
    S: NativeStatement + ?Sized,
{
    let mut count = 0u16;
    let ret = stmt.num_result_cols(&mut count);
    native::check(stmt, ops::NUM_RESULT_COLS, ret)?;

    let mut columns = Vec::with_capacity(usize::from(count));
    for ordinal in 0..count {
        let mut description = ColumnDescription::default();
        let ret = stmt.describe_col(ordinal + 1, &mut description);
        native::check(stmt, ops::DESCRIBE_COL, ret)?;

        let column = column_for(ordinal, &description, config)?;
        debug!(
            "Column {} '{}': SQL type {} as {} ({})",
            ordinal,
            column.name(),
            description.data_type.0,
            column.c_type(),
            column.strategy()
        );
        columns.push(column);
    }

    Ok(columns)
}
