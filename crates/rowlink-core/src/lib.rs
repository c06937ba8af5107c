//! # rowlink-core
//!
//! Row materialization and type mapping for ODBC result sets.
//!
//! Given an executed statement, this crate describes its result set, picks a
//! transfer strategy per column, and turns each fetched row into owned
//! portable values. It includes:
//!
//! - **Catalog**: C data type codes to display names and value kinds
//! - **Columns**: bound fixed buffers or chunked explicit reads
//! - **Cursor**: `Rows`, driving fetch and per-column extraction
//! - **Metadata**: column names and types captured once per result set
//! - **Native**: the statement interface, an in-memory engine, and (feature
//!   `odbc`) a driver manager backend
//!
//! ## Quick Start
//!
//! ```rust
//! use rowlink_core::native::{Cell, ColumnDescription, ScriptedStatement, SqlDataType};
//! use rowlink_core::{FetchConfig, Rows, ValueKind};
//!
//! # fn main() -> rowlink_core::OdbcResult<()> {
//! let mut stmt = ScriptedStatement::new(vec![
//!     ColumnDescription::new("id", SqlDataType::INTEGER, 10),
//!     ColumnDescription::new("score", SqlDataType::DOUBLE, 15),
//! ])
//! .with_row(vec![Cell::long(1), Cell::double(3.5)])
//! .with_row(vec![Cell::long(2), Cell::null()]);
//!
//! let mut rows = Rows::open(&mut stmt, FetchConfig::default())?;
//! assert_eq!(rows.scan_value_kind(1)?, ValueKind::NullableFloat64);
//! assert_eq!(rows.database_type_name(0)?, "SQL_C_LONG");
//!
//! while let Some(row) = rows.fetch_row()? {
//!     println!("{}", row);
//! }
//! rows.close()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod column;
pub mod describe;
pub mod metadata;
pub mod native;
pub mod row;
pub mod rows;
pub mod value;

pub use catalog::{classify, CType, SqlType, ValueKind};
pub use column::{BindingStrategy, Column, ColumnState};
pub use describe::describe_result_set;
pub use metadata::ResultMetadata;
pub use native::{NativeStatement, SqlReturn};
pub use row::Row;
pub use rows::{FetchStatus, Rows};
pub use value::Value;

pub use rowlink_common::config::{ChunkTermination, FetchConfig};
pub use rowlink_common::error::{DiagnosticRecord, OdbcError, OdbcResult};
