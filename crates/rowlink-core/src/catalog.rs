//! Type catalog.
//!
//! Maps native C data type codes to a display name and the portable value
//! kind a caller should decode into. This is the single source of truth for
//! how every other component interprets a C type code.
//!
//! Lookup is total: codes the catalog does not know classify as
//! [`ValueKind::Unknown`] with an empty display name.

use std::fmt;

use rowlink_common::constants::{
    DATE_STRUCT_SIZE, GUID_STRUCT_SIZE, NUMERIC_STRUCT_SIZE, TIMESTAMP_STRUCT_SIZE,
    TIME_STRUCT_SIZE,
};

/// A native C data type code (`SQL_C_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CType(pub i16);

impl CType {
    /// `SQL_C_CHAR`: narrow character data.
    pub const CHAR: CType = CType(1);
    /// `SQL_C_NUMERIC`: `SQL_NUMERIC_STRUCT`.
    pub const NUMERIC: CType = CType(2);
    /// `SQL_C_LONG`: 32-bit signed integer.
    pub const LONG: CType = CType(4);
    /// `SQL_C_SHORT`: 16-bit signed integer.
    pub const SHORT: CType = CType(5);
    /// `SQL_C_FLOAT`: 32-bit float.
    pub const FLOAT: CType = CType(7);
    /// `SQL_C_DOUBLE`: 64-bit float.
    pub const DOUBLE: CType = CType(8);
    /// `SQL_C_DATE`: `SQL_DATE_STRUCT`.
    pub const DATE: CType = CType(9);
    /// `SQL_C_TIME`: `SQL_TIME_STRUCT`.
    pub const TIME: CType = CType(10);
    /// `SQL_C_TIMESTAMP`: `SQL_TIMESTAMP_STRUCT` (ODBC 2 code).
    pub const TIMESTAMP: CType = CType(11);
    /// `SQL_C_TYPE_TIMESTAMP`: `SQL_TIMESTAMP_STRUCT` (ODBC 3 code).
    pub const TYPE_TIMESTAMP: CType = CType(93);
    /// `SQL_C_DEFAULT`: driver chooses the representation.
    pub const DEFAULT: CType = CType(99);
    /// `SQL_C_BINARY`: raw bytes.
    pub const BINARY: CType = CType(-2);
    /// `SQL_C_BIT`: single byte, 0 or 1.
    pub const BIT: CType = CType(-7);
    /// `SQL_C_WCHAR`: UTF-16 character data.
    pub const WCHAR: CType = CType(-8);
    /// `SQL_C_GUID`: `SQLGUID`.
    pub const GUID: CType = CType(-11);
    /// `SQL_C_SBIGINT`: 64-bit signed integer.
    pub const SBIGINT: CType = CType(-25);
    /// `SQL_C_UBIGINT`: 64-bit unsigned integer.
    pub const UBIGINT: CType = CType(-27);

    /// Every code the catalog recognizes.
    pub const KNOWN: [CType; 17] = [
        CType::CHAR,
        CType::LONG,
        CType::SHORT,
        CType::FLOAT,
        CType::DOUBLE,
        CType::NUMERIC,
        CType::DATE,
        CType::TIME,
        CType::TYPE_TIMESTAMP,
        CType::TIMESTAMP,
        CType::BINARY,
        CType::BIT,
        CType::WCHAR,
        CType::DEFAULT,
        CType::SBIGINT,
        CType::UBIGINT,
        CType::GUID,
    ];

    /// Returns the raw code.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> i16 {
        self.0
    }

    /// Returns the catalog display name, empty if unrecognized.
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        classify(self).name
    }

    /// Returns the width of the C representation for fixed-width types.
    ///
    /// Character, binary, and default data are variable width.
    #[must_use]
    pub const fn fixed_width(self) -> Option<usize> {
        match self.0 {
            4 | 7 => Some(4),
            5 => Some(2),
            8 | -25 | -27 => Some(8),
            -7 => Some(1),
            9 => Some(DATE_STRUCT_SIZE),
            10 => Some(TIME_STRUCT_SIZE),
            11 | 93 => Some(TIMESTAMP_STRUCT_SIZE),
            -11 => Some(GUID_STRUCT_SIZE),
            2 => Some(NUMERIC_STRUCT_SIZE),
            _ => None,
        }
    }

    /// Returns the size of the NUL terminator a driver appends to data of
    /// this type.
    #[must_use]
    pub const fn terminator_len(self) -> usize {
        match self.0 {
            1 => 1,
            -8 => 2,
            _ => 0,
        }
    }

    /// Returns true for UTF-16 character data.
    #[inline]
    #[must_use]
    pub const fn is_wide(self) -> bool {
        self.0 == CType::WCHAR.0
    }
}

impl fmt::Display for CType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            "" => write!(f, "{}", self.0),
            name => f.write_str(name),
        }
    }
}

/// Portable value kind a column should be scanned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Opaque bytes: text, binary, and textual temporal encodings.
    RawBytes,
    /// Nullable 64-bit integer.
    NullableInt64,
    /// Nullable 64-bit float.
    NullableFloat64,
    /// Not classified.
    Unknown,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::RawBytes => write!(f, "raw_bytes"),
            ValueKind::NullableInt64 => write!(f, "nullable_int64"),
            ValueKind::NullableFloat64 => write!(f, "nullable_float64"),
            ValueKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// A catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqlType {
    /// Display name, empty if unrecognized.
    pub name: &'static str,
    /// Value kind to scan into.
    pub kind: ValueKind,
}

impl SqlType {
    const fn new(name: &'static str, kind: ValueKind) -> Self {
        Self { name, kind }
    }

    /// Returns the display name.
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the value kind.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Returns true if the code was recognized.
    #[inline]
    #[must_use]
    pub const fn is_known(&self) -> bool {
        !matches!(self.kind, ValueKind::Unknown)
    }
}

/// Classifies a C data type code.
///
/// # Example
///
/// ```rust
/// use rowlink_core::catalog::{classify, CType, ValueKind};
///
/// let entry = classify(CType::LONG);
/// assert_eq!(entry.name, "SQL_C_LONG");
/// assert_eq!(entry.kind, ValueKind::NullableInt64);
///
/// let entry = classify(CType(1234));
/// assert_eq!(entry.name, "");
/// assert_eq!(entry.kind, ValueKind::Unknown);
/// ```
#[must_use]
pub const fn classify(code: CType) -> SqlType {
    use ValueKind::{NullableFloat64, NullableInt64, RawBytes};

    match code.0 {
        1 => SqlType::new("SQL_C_CHAR", RawBytes),
        4 => SqlType::new("SQL_C_LONG", NullableInt64),
        5 => SqlType::new("SQL_C_SHORT", NullableInt64),
        7 => SqlType::new("SQL_C_FLOAT", NullableFloat64),
        8 => SqlType::new("SQL_C_DOUBLE", NullableFloat64),
        2 => SqlType::new("SQL_C_NUMERIC", NullableInt64),
        9 => SqlType::new("SQL_C_DATE", RawBytes),
        10 => SqlType::new("SQL_C_TIME", RawBytes),
        93 => SqlType::new("SQL_C_TYPE_TIMESTAMP", RawBytes),
        11 => SqlType::new("SQL_C_TIMESTAMP", RawBytes),
        -2 => SqlType::new("SQL_C_BINARY", RawBytes),
        -7 => SqlType::new("SQL_C_BIT", RawBytes),
        -8 => SqlType::new("SQL_C_WCHAR", RawBytes),
        99 => SqlType::new("SQL_C_DEFAULT", RawBytes),
        -25 => SqlType::new("SQL_C_SBIGINT", NullableInt64),
        -27 => SqlType::new("SQL_C_UBIGINT", NullableInt64),
        // GUIDs classify as integers; decoding still yields their text form.
        -11 => SqlType::new("SQL_C_GUID", NullableInt64),
        _ => SqlType::new("", ValueKind::Unknown),
    }
}
