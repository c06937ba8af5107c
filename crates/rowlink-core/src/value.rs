//! Portable column values and native decoding.
//!
//! Every column value is reduced to one of five shapes: NULL, signed
//! integer, unsigned integer, float, or an opaque byte sequence. Text,
//! binary data, and the textual forms of date, time, timestamp, numeric,
//! GUID, and bit values are all byte sequences.

use std::fmt;

use bytes::Bytes;
use rowlink_common::constants::NUMERIC_MANTISSA_LEN;
use rowlink_common::error::{OdbcError, OdbcResult};
use uuid::Uuid;

use crate::catalog::CType;

/// A column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Signed integer.
    Int(i64),
    /// Unsigned integer.
    UInt(u64),
    /// Floating point.
    Float(f64),
    /// Opaque bytes.
    Bytes(Bytes),
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl Value {
    /// Creates a byte value from a string.
    pub fn text(s: impl Into<String>) -> Self {
        Value::Bytes(Bytes::from(s.into()))
    }

    /// Creates a byte value by copying a slice.
    pub fn bytes(b: &[u8]) -> Self {
        Value::Bytes(Bytes::copy_from_slice(b))
    }

    /// Returns true if the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Tries to get as a signed integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::UInt(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    /// Tries to get as an unsigned integer.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(u) => Some(*u),
            Value::Int(i) => u64::try_from(*i).ok(),
            _ => None,
        }
    }

    /// Tries to get as a float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Tries to get as bytes.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Tries to get as UTF-8 text.
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    /// Returns the type name of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Int(_) => "INT",
            Value::UInt(_) => "UINT",
            Value::Float(_) => "FLOAT",
            Value::Bytes(_) => "BYTES",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Int(i) => write!(f, "{}", i),
            Value::UInt(u) => write!(f, "{}", u),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::Bytes(b) => match std::str::from_utf8(b) {
                Ok(s) => write!(f, "{}", s),
                Err(_) => {
                    write!(f, "0x")?;
                    for byte in b.iter() {
                        write!(f, "{:02X}", byte)?;
                    }
                    Ok(())
                }
            },
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::text(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(Bytes::from(v))
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Self {
        Value::Bytes(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Decodes the native representation of a non-null value.
///
/// `data` holds exactly the bytes the indicator reported, without any NUL
/// terminator.
///
/// # Errors
///
/// Returns `UnexpectedLength` if a fixed-width type arrives with the wrong
/// number of bytes.
pub fn decode(column: u16, c_type: CType, data: &[u8]) -> OdbcResult<Value> {
    if let Some(width) = c_type.fixed_width() {
        if data.len() != width {
            return Err(OdbcError::UnexpectedLength {
                column,
                expected: width,
                actual: data.len(),
            });
        }
    }

    let value = match c_type {
        CType::LONG => Value::Int(i64::from(i32::from_ne_bytes(array(data)))),
        CType::SHORT => Value::Int(i64::from(i16::from_ne_bytes(array(data)))),
        CType::SBIGINT => Value::Int(i64::from_ne_bytes(array(data))),
        CType::UBIGINT => Value::UInt(u64::from_ne_bytes(array(data))),
        CType::FLOAT => Value::Float(f64::from(f32::from_ne_bytes(array(data)))),
        CType::DOUBLE => Value::Float(f64::from_ne_bytes(array(data))),
        CType::BIT => Value::bytes(if data[0] != 0 { b"1" } else { b"0" }),
        CType::WCHAR => Value::text(decode_wide(data)),
        CType::DATE => Value::text(format_date(data)),
        CType::TIME => Value::text(format_time(data)),
        CType::TIMESTAMP | CType::TYPE_TIMESTAMP => Value::text(format_timestamp(data)),
        CType::GUID => Value::text(format_guid(data)),
        CType::NUMERIC => Value::text(format_numeric(data)),
        _ => Value::bytes(data),
    };

    Ok(value)
}

/// Decodes an owned accumulation without copying pass-through types.
///
/// # Errors
///
/// Same as [`decode`].
pub fn decode_owned(column: u16, c_type: CType, data: Bytes) -> OdbcResult<Value> {
    if c_type.fixed_width().is_none() && !c_type.is_wide() {
        return Ok(Value::Bytes(data));
    }
    decode(column, c_type, &data)
}

/// Copies a prefix of `data` into a fixed array. Callers check the length.
fn array<const N: usize>(data: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&data[..N]);
    out
}

fn u16_at(data: &[u8], offset: usize) -> u16 {
    u16::from_ne_bytes([data[offset], data[offset + 1]])
}

fn i16_at(data: &[u8], offset: usize) -> i16 {
    i16::from_ne_bytes([data[offset], data[offset + 1]])
}

fn u32_at(data: &[u8], offset: usize) -> u32 {
    u32::from_ne_bytes(array(&data[offset..]))
}

/// UTF-16 (native endian) to UTF-8. Unpaired surrogates become U+FFFD.
fn decode_wide(data: &[u8]) -> String {
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|pair| u16::from_ne_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

fn format_date(data: &[u8]) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        i16_at(data, 0),
        u16_at(data, 2),
        u16_at(data, 4)
    )
}

fn format_time(data: &[u8]) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        u16_at(data, 0),
        u16_at(data, 2),
        u16_at(data, 4)
    )
}

fn format_timestamp(data: &[u8]) -> String {
    let mut out = format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        i16_at(data, 0),
        u16_at(data, 2),
        u16_at(data, 4),
        u16_at(data, 6),
        u16_at(data, 8),
        u16_at(data, 10)
    );

    let fraction = u32_at(data, 12);
    if fraction != 0 {
        out.push_str(&format!(".{:09}", fraction));
    }
    out
}

fn format_guid(data: &[u8]) -> String {
    let d1 = u32_at(data, 0);
    let d2 = u16_at(data, 4);
    let d3 = u16_at(data, 6);
    let d4: [u8; 8] = array(&data[8..]);
    Uuid::from_fields(d1, d2, d3, &d4).hyphenated().to_string()
}

/// Renders `SQL_NUMERIC_STRUCT` as decimal text.
fn format_numeric(data: &[u8]) -> String {
    // precision (data[0]) only bounds the digit count; the mantissa is exact.
    let scale = i8::from_ne_bytes([data[1]]);
    let positive = data[2] == 1;
    let mantissa = u128::from_le_bytes(array::<NUMERIC_MANTISSA_LEN>(&data[3..]));

    let mut digits = mantissa.to_string();
    let sign = if positive || mantissa == 0 { "" } else { "-" };

    match scale {
        s if s > 0 => {
            let scale = usize::from(s.unsigned_abs());
            if digits.len() <= scale {
                digits = format!("{}{}", "0".repeat(scale - digits.len() + 1), digits);
            }
            let split = digits.len() - scale;
            format!("{}{}.{}", sign, &digits[..split], &digits[split..])
        }
        s if s < 0 && mantissa != 0 => {
            format!("{}{}{}", sign, digits, "0".repeat(usize::from(s.unsigned_abs())))
        }
        _ => format!("{}{}", sign, digits),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timestamp_bytes(y: i16, mo: u16, d: u16, h: u16, mi: u16, s: u16, frac: u32) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&y.to_ne_bytes());
        for field in [mo, d, h, mi, s] {
            out.extend_from_slice(&field.to_ne_bytes());
        }
        out.extend_from_slice(&frac.to_ne_bytes());
        out
    }

    fn numeric_bytes(scale: i8, positive: bool, mantissa: u128) -> Vec<u8> {
        let mut out = vec![38, scale as u8, u8::from(positive)];
        out.extend_from_slice(&mantissa.to_le_bytes());
        out
    }

    #[test]
    fn test_decode_integers() {
        assert_eq!(
            decode(0, CType::LONG, &(-7i32).to_ne_bytes()).unwrap(),
            Value::Int(-7)
        );
        assert_eq!(
            decode(0, CType::SHORT, &300i16.to_ne_bytes()).unwrap(),
            Value::Int(300)
        );
        assert_eq!(
            decode(0, CType::SBIGINT, &i64::MIN.to_ne_bytes()).unwrap(),
            Value::Int(i64::MIN)
        );
        assert_eq!(
            decode(0, CType::UBIGINT, &u64::MAX.to_ne_bytes()).unwrap(),
            Value::UInt(u64::MAX)
        );
    }

    #[test]
    fn test_decode_floats() {
        assert_eq!(
            decode(0, CType::DOUBLE, &3.5f64.to_ne_bytes()).unwrap(),
            Value::Float(3.5)
        );
        assert_eq!(
            decode(0, CType::FLOAT, &0.25f32.to_ne_bytes()).unwrap(),
            Value::Float(0.25)
        );
    }

    #[test]
    fn test_decode_wrong_width() {
        let err = decode(3, CType::LONG, &[1, 2]).unwrap_err();
        assert!(matches!(
            err,
            OdbcError::UnexpectedLength {
                column: 3,
                expected: 4,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_decode_bytes_passthrough() {
        assert_eq!(decode(0, CType::CHAR, b"alice").unwrap(), Value::text("alice"));
        assert_eq!(
            decode(0, CType::BINARY, &[0xDE, 0xAD]).unwrap(),
            Value::bytes(&[0xDE, 0xAD])
        );
        assert_eq!(decode(0, CType(1234), b"??").unwrap(), Value::bytes(b"??"));
    }

    #[test]
    fn test_decode_bit() {
        assert_eq!(decode(0, CType::BIT, &[1]).unwrap(), Value::text("1"));
        assert_eq!(decode(0, CType::BIT, &[0]).unwrap(), Value::text("0"));
    }

    #[test]
    fn test_decode_wide() {
        let units: Vec<u8> = "héllo ✓"
            .encode_utf16()
            .flat_map(u16::to_ne_bytes)
            .collect();
        assert_eq!(decode(0, CType::WCHAR, &units).unwrap(), Value::text("héllo ✓"));
    }

    #[test]
    fn test_decode_temporal() {
        let mut date = Vec::new();
        date.extend_from_slice(&2024i16.to_ne_bytes());
        date.extend_from_slice(&2u16.to_ne_bytes());
        date.extend_from_slice(&29u16.to_ne_bytes());
        assert_eq!(decode(0, CType::DATE, &date).unwrap(), Value::text("2024-02-29"));

        let mut time = Vec::new();
        for field in [7u16, 5, 9] {
            time.extend_from_slice(&field.to_ne_bytes());
        }
        assert_eq!(decode(0, CType::TIME, &time).unwrap(), Value::text("07:05:09"));

        let ts = timestamp_bytes(1999, 12, 31, 23, 59, 58, 0);
        assert_eq!(
            decode(0, CType::TYPE_TIMESTAMP, &ts).unwrap(),
            Value::text("1999-12-31 23:59:58")
        );

        let ts = timestamp_bytes(2001, 1, 2, 3, 4, 5, 120_000_000);
        assert_eq!(
            decode(0, CType::TIMESTAMP, &ts).unwrap(),
            Value::text("2001-01-02 03:04:05.120000000")
        );
    }

    #[test]
    fn test_decode_guid() {
        let mut guid = Vec::new();
        guid.extend_from_slice(&0x6F9619FFu32.to_ne_bytes());
        guid.extend_from_slice(&0x8B86u16.to_ne_bytes());
        guid.extend_from_slice(&0xD011u16.to_ne_bytes());
        guid.extend_from_slice(&[0xB4, 0x2D, 0x00, 0xC0, 0x4F, 0xC9, 0x64, 0xFF]);
        assert_eq!(
            decode(0, CType::GUID, &guid).unwrap(),
            Value::text("6f9619ff-8b86-d011-b42d-00c04fc964ff")
        );
    }

    #[test]
    fn test_decode_numeric() {
        let cases = [
            (numeric_bytes(2, true, 12345), "123.45"),
            (numeric_bytes(2, false, 12345), "-123.45"),
            (numeric_bytes(4, true, 5), "0.0005"),
            (numeric_bytes(0, true, 42), "42"),
            (numeric_bytes(-2, true, 7), "700"),
            (numeric_bytes(3, false, 0), "0.000"),
        ];
        for (data, expected) in cases {
            assert_eq!(decode(0, CType::NUMERIC, &data).unwrap(), Value::text(expected));
        }
    }

    #[test]
    fn test_decode_owned_passthrough() {
        let data = Bytes::from_static(b"payload");
        assert_eq!(
            decode_owned(0, CType::BINARY, data.clone()).unwrap(),
            Value::Bytes(data)
        );
    }

    #[test]
    fn test_value_accessors() {
        assert!(Value::Null.is_null());
        assert_eq!(Value::Int(5).as_i64(), Some(5));
        assert_eq!(Value::UInt(5).as_i64(), Some(5));
        assert_eq!(Value::UInt(u64::MAX).as_i64(), None);
        assert_eq!(Value::Int(-1).as_u64(), None);
        assert_eq!(Value::Float(1.5).as_f64(), Some(1.5));
        assert_eq!(Value::text("bob").as_str(), Some("bob"));
        assert_eq!(Value::from(Some(3i64)), Value::Int(3));
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::text("alice").to_string(), "alice");
        assert_eq!(Value::bytes(&[0xBE, 0xEF, 0x00]).to_string(), "0xBEEF00");
    }
}
