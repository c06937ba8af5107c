//! System-wide constants for rowlink.
//!
//! Values mirror the ODBC C API wherever a native engine interprets them.

// =============================================================================
// Indicator Sentinels
// =============================================================================

/// Indicator value reporting that the fetched column is NULL.
pub const SQL_NULL_DATA: isize = -1;

/// Indicator value reporting that the driver cannot tell how many bytes remain.
pub const SQL_NO_TOTAL: isize = -4;

// =============================================================================
// SQLSTATE Codes
// =============================================================================

/// SQLSTATE reported with `SQL_SUCCESS_WITH_INFO` when character or binary
/// data did not fit the supplied buffer ("string data, right truncated").
pub const SQLSTATE_STRING_TRUNCATED: &str = "01004";

/// SQLSTATE used for diagnostics synthesized by this layer (general error).
pub const SQLSTATE_GENERAL_ERROR: &str = "HY000";

/// Length of a SQLSTATE code in bytes.
pub const SQLSTATE_LEN: usize = 5;

// =============================================================================
// Fetch Defaults
// =============================================================================

/// Default scratch buffer size for chunked reads (1 KB).
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Smallest usable scratch buffer.
///
/// Must leave room for a wide-character NUL terminator plus at least one
/// payload code unit.
pub const MIN_CHUNK_SIZE: usize = 4;

/// Default upper bound for a grown scratch buffer (1 MB).
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 1024 * 1024;

/// Default upper bound for one accumulated column value (256 MB).
pub const DEFAULT_MAX_VALUE_SIZE: usize = 256 * 1024 * 1024;

/// Widest declared column size that is still bound instead of read in chunks.
pub const DEFAULT_MAX_BINDABLE_WIDTH: usize = 1024;

/// Maximum column name length requested from the driver.
pub const MAX_COLUMN_NAME_LEN: usize = 256;

/// Maximum diagnostic message length requested from the driver.
pub const MAX_DIAGNOSTIC_MESSAGE_LEN: usize = 1024;

// =============================================================================
// Native Struct Widths
// =============================================================================

/// Alignment of every column buffer. Large enough for any bound C scalar.
pub const BUFFER_ALIGNMENT: usize = 8;

/// `SQL_DATE_STRUCT`: year (i16), month (u16), day (u16).
pub const DATE_STRUCT_SIZE: usize = 6;

/// `SQL_TIME_STRUCT`: hour (u16), minute (u16), second (u16).
pub const TIME_STRUCT_SIZE: usize = 6;

/// `SQL_TIMESTAMP_STRUCT`: date and time fields plus a u32 fraction in
/// nanoseconds.
pub const TIMESTAMP_STRUCT_SIZE: usize = 16;

/// `SQLGUID`: u32, u16, u16, then 8 bytes.
pub const GUID_STRUCT_SIZE: usize = 16;

/// `SQL_NUMERIC_STRUCT`: precision (u8), scale (i8), sign (u8), and a
/// 16-byte little-endian mantissa.
pub const NUMERIC_STRUCT_SIZE: usize = 19;

/// Mantissa width inside `SQL_NUMERIC_STRUCT`.
pub const NUMERIC_MANTISSA_LEN: usize = 16;
