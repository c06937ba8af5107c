//! Error types for cursor and column operations.
//!
//! Every failure surfaced by the row layer is one of these variants. Native
//! call failures carry the failing operation name and the diagnostic records
//! the driver attached to the statement handle.

use std::fmt;
use thiserror::Error;

use crate::constants::{SQLSTATE_GENERAL_ERROR, SQLSTATE_STRING_TRUNCATED};

/// Error codes for categorizing errors.
///
/// These codes can be used for programmatic error handling and
/// are stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // General errors (0x0000 - 0x00FF)
    /// Unknown or unspecified error.
    Unknown = 0x0000,
    /// Invalid argument provided.
    InvalidArgument = 0x0003,

    // Native errors (0x0100 - 0x01FF)
    /// A native ODBC call returned an error.
    NativeCall = 0x0100,

    // Column errors (0x0200 - 0x02FF)
    /// Column SQL type cannot be mapped.
    UnsupportedType = 0x0200,
    /// Engine reported a length that contradicts the column type.
    UnexpectedLength = 0x0201,
    /// Value does not fit the buffer reserved for it.
    Truncated = 0x0202,
    /// Accumulated value exceeds the configured limit.
    ValueTooLarge = 0x0203,
    /// Column index is not part of the result set.
    ColumnOutOfRange = 0x0204,

    // Cursor errors (0x0300 - 0x03FF)
    /// Row buffer width does not match the result set.
    ColumnCountMismatch = 0x0300,
    /// Cursor failed earlier and can no longer be driven.
    CursorUnusable = 0x0301,
    /// Cursor has been closed.
    CursorClosed = 0x0302,

    // Configuration errors (0x0400 - 0x04FF)
    /// Configuration is invalid.
    InvalidConfig = 0x0400,
    /// Configuration file could not be read.
    Io = 0x0401,
}

impl ErrorCode {
    /// Returns the numeric code.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match (*self as u16) >> 8 {
            0x00 => "General",
            0x01 => "Native",
            0x02 => "Column",
            0x03 => "Cursor",
            0x04 => "Config",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// One diagnostic record retrieved from a native handle.
///
/// Mirrors the triple returned by `SQLGetDiagRec`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRecord {
    /// Five character SQLSTATE.
    pub state: String,
    /// Driver specific error code.
    pub native_error: i32,
    /// Human readable message.
    pub message: String,
}

impl DiagnosticRecord {
    /// Creates a diagnostic record.
    #[must_use]
    pub fn new(state: impl Into<String>, native_error: i32, message: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            native_error,
            message: message.into(),
        }
    }

    /// Creates a general error record (`HY000`).
    #[must_use]
    pub fn general(message: impl Into<String>) -> Self {
        Self::new(SQLSTATE_GENERAL_ERROR, 0, message)
    }

    /// Returns true if this record reports right truncation of string data.
    #[must_use]
    pub fn is_truncation(&self) -> bool {
        self.state == SQLSTATE_STRING_TRUNCATED
    }
}

impl fmt::Display for DiagnosticRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.state, self.message)?;
        if self.native_error != 0 {
            write!(f, " (native error {})", self.native_error)?;
        }
        Ok(())
    }
}

/// Renders the first record of a diagnostic list for error messages.
struct FirstRecord<'a>(&'a [DiagnosticRecord]);

impl fmt::Display for FirstRecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.first() {
            Some(record) => write!(f, "{record}"),
            None => write!(f, "no diagnostics available"),
        }
    }
}

/// The main error type for rowlink.
///
/// # Example
///
/// ```rust
/// use rowlink_common::error::{DiagnosticRecord, OdbcError, OdbcResult};
///
/// fn fetch() -> OdbcResult<()> {
///     Err(OdbcError::native(
///         "SQLFetch",
///         vec![DiagnosticRecord::new("08S01", 10054, "connection reset")],
///     ))
/// }
///
/// let err = fetch().unwrap_err();
/// assert_eq!(err.operation(), Some("SQLFetch"));
/// assert_eq!(err.sqlstate(), Some("08S01"));
/// ```
#[derive(Debug, Error)]
pub enum OdbcError {
    // ==========================================================================
    // Native Errors
    // ==========================================================================
    /// A native call returned an error.
    #[error("{operation} failed: {}", FirstRecord(.records))]
    Native {
        /// Name of the failing native function.
        operation: &'static str,
        /// Diagnostic records attached to the handle.
        records: Vec<DiagnosticRecord>,
    },

    // ==========================================================================
    // Column Errors
    // ==========================================================================
    /// The engine described a column with a SQL type this layer cannot read.
    #[error("column {column} has unsupported SQL type {sql_type}")]
    UnsupportedColumnType {
        /// Zero-based column ordinal.
        column: u16,
        /// Native SQL type code.
        sql_type: i16,
    },

    /// The indicator disagrees with the fixed width of the column type.
    #[error("column {column} returned {actual} bytes, {expected} expected")]
    UnexpectedLength {
        /// Zero-based column ordinal.
        column: u16,
        /// Width of the C type.
        expected: usize,
        /// Length reported by the engine.
        actual: usize,
    },

    /// The value is longer than the buffer reserved for it.
    #[error("column {column} value of {indicator} bytes does not fit buffer of {capacity} bytes")]
    Truncated {
        /// Zero-based column ordinal.
        column: u16,
        /// Length reported by the engine indicator.
        indicator: isize,
        /// Usable buffer capacity.
        capacity: usize,
    },

    /// A chunked value grew beyond the configured limit.
    #[error("column {column} value exceeds limit of {limit} bytes")]
    ChunkLimitExceeded {
        /// Zero-based column ordinal.
        column: u16,
        /// Configured `max_value_size`.
        limit: usize,
    },

    /// Column index is outside the result set.
    #[error("column index {index} out of range for {count} columns")]
    ColumnIndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of columns in the result set.
        count: usize,
    },

    // ==========================================================================
    // Cursor Errors
    // ==========================================================================
    /// The row buffer does not have one slot per column.
    #[error("row buffer has {actual} slots, result set has {expected} columns")]
    ColumnCountMismatch {
        /// Number of columns in the result set.
        expected: usize,
        /// Length of the row buffer supplied.
        actual: usize,
    },

    /// A previous fetch or extraction failed; the cursor position is undefined.
    #[error("cursor is unusable after a previous failure")]
    CursorUnusable,

    /// The cursor has already been closed.
    #[error("cursor is closed")]
    CursorClosed,

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Invalid configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Error message.
        message: String,
    },

    /// I/O error while reading or writing configuration.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("config parse error: {source}")]
    ConfigParse {
        /// The underlying TOML error.
        #[from]
        source: toml::de::Error,
    },

    /// Configuration could not be serialized.
    #[error("config serialize error: {source}")]
    ConfigSerialize {
        /// The underlying TOML error.
        #[from]
        source: toml::ser::Error,
    },
}

impl OdbcError {
    /// Returns the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Native { .. } => ErrorCode::NativeCall,
            Self::UnsupportedColumnType { .. } => ErrorCode::UnsupportedType,
            Self::UnexpectedLength { .. } => ErrorCode::UnexpectedLength,
            Self::Truncated { .. } => ErrorCode::Truncated,
            Self::ChunkLimitExceeded { .. } => ErrorCode::ValueTooLarge,
            Self::ColumnIndexOutOfRange { .. } => ErrorCode::ColumnOutOfRange,
            Self::ColumnCountMismatch { .. } => ErrorCode::ColumnCountMismatch,
            Self::CursorUnusable => ErrorCode::CursorUnusable,
            Self::CursorClosed => ErrorCode::CursorClosed,
            Self::InvalidConfig { .. } | Self::ConfigParse { .. } | Self::ConfigSerialize { .. } => {
                ErrorCode::InvalidConfig
            }
            Self::Io { .. } => ErrorCode::Io,
        }
    }

    /// Returns true if this error came from a native call.
    #[must_use]
    pub const fn is_native(&self) -> bool {
        matches!(self, Self::Native { .. })
    }

    /// Returns true if this error is retryable.
    ///
    /// Always false: engines give no idempotence guarantee for a fetch that
    /// failed part way, so nothing in this layer is retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        false
    }

    /// Creates a native call error.
    #[must_use]
    pub fn native(operation: &'static str, records: Vec<DiagnosticRecord>) -> Self {
        Self::Native { operation, records }
    }

    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Returns the failing native operation, if this is a native error.
    #[must_use]
    pub fn operation(&self) -> Option<&'static str> {
        match self {
            Self::Native { operation, .. } => Some(operation),
            _ => None,
        }
    }

    /// Returns all diagnostic records, empty for non-native errors.
    #[must_use]
    pub fn diagnostics(&self) -> &[DiagnosticRecord] {
        match self {
            Self::Native { records, .. } => records,
            _ => &[],
        }
    }

    /// Returns the SQLSTATE of the first diagnostic record.
    #[must_use]
    pub fn sqlstate(&self) -> Option<&str> {
        self.diagnostics().first().map(|r| r.state.as_str())
    }

    /// Returns the native error code of the first diagnostic record.
    #[must_use]
    pub fn native_code(&self) -> Option<i32> {
        self.diagnostics().first().map(|r| r.native_error)
    }

    /// Returns the message of the first diagnostic record.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.diagnostics().first().map(|r| r.message.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        let err = OdbcError::native("SQLFetch", vec![]);
        assert_eq!(err.code(), ErrorCode::NativeCall);
        assert_eq!(err.code().category(), "Native");
        assert_eq!(OdbcError::CursorClosed.code().category(), "Cursor");
    }

    #[test]
    fn test_native_display() {
        let err = OdbcError::native(
            "SQLGetData",
            vec![DiagnosticRecord::new("HY010", 0, "function sequence error")],
        );
        assert_eq!(
            err.to_string(),
            "SQLGetData failed: [HY010] function sequence error"
        );

        let err = OdbcError::native("SQLFetch", vec![]);
        assert_eq!(err.to_string(), "SQLFetch failed: no diagnostics available");
    }

    #[test]
    fn test_native_accessors() {
        let err = OdbcError::native(
            "SQLFetch",
            vec![
                DiagnosticRecord::new("08S01", 10054, "communication link failure"),
                DiagnosticRecord::general("secondary"),
            ],
        );
        assert!(err.is_native());
        assert!(!err.is_retryable());
        assert_eq!(err.operation(), Some("SQLFetch"));
        assert_eq!(err.sqlstate(), Some("08S01"));
        assert_eq!(err.native_code(), Some(10054));
        assert_eq!(err.message(), Some("communication link failure"));
        assert_eq!(err.diagnostics().len(), 2);
    }

    #[test]
    fn test_non_native_accessors() {
        let err = OdbcError::CursorUnusable;
        assert!(!err.is_native());
        assert_eq!(err.operation(), None);
        assert_eq!(err.sqlstate(), None);
        assert!(err.diagnostics().is_empty());
    }

    #[test]
    fn test_diagnostic_record() {
        let record = DiagnosticRecord::new("01004", 0, "String data, right truncated");
        assert!(record.is_truncation());
        assert_eq!(record.to_string(), "[01004] String data, right truncated");

        let record = DiagnosticRecord::new("42S02", 208, "Invalid object name");
        assert!(!record.is_truncation());
        assert_eq!(record.to_string(), "[42S02] Invalid object name (native error 208)");
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: OdbcError = io_err.into();
        assert_eq!(err.code(), ErrorCode::Io);
    }
}
