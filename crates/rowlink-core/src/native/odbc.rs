//! Statement interface over a driver manager handle.

use odbc_sys::{
    CDataType, FreeStmtOption, HStmt, Handle, HandleType, Len, Nullability as SysNullability,
    Pointer, SQLBindCol, SQLDescribeCol, SQLFetch, SQLFreeStmt, SQLGetData, SQLGetDiagRec,
    SQLNumResultCols, SqlDataType as SysSqlDataType, SqlReturn as SysSqlReturn,
};
use rowlink_common::constants::{MAX_COLUMN_NAME_LEN, MAX_DIAGNOSTIC_MESSAGE_LEN, SQLSTATE_LEN};
use rowlink_common::error::DiagnosticRecord;
use rowlink_common::memory::ColumnBuffer;

use super::{ColumnDescription, NativeStatement, Nullability, SqlDataType, SqlReturn};
use crate::catalog::CType;

/// Driver diagnostic records are numbered from one; stop after this many.
const MAX_DIAGNOSTIC_RECORDS: i16 = 16;

fn convert(ret: SysSqlReturn) -> SqlReturn {
    SqlReturn::from_raw(ret.0)
}

fn c_data_type(c_type: CType) -> Option<CDataType> {
    let mapped = match c_type {
        CType::CHAR => CDataType::Char,
        CType::NUMERIC => CDataType::Numeric,
        CType::LONG => CDataType::Long,
        CType::SHORT => CDataType::Short,
        CType::FLOAT => CDataType::Float,
        CType::DOUBLE => CDataType::Double,
        CType::DATE => CDataType::Date,
        CType::TIME => CDataType::Time,
        CType::TIMESTAMP => CDataType::TimeStamp,
        CType::TYPE_TIMESTAMP => CDataType::TypeTimestamp,
        CType::DEFAULT => CDataType::Default,
        CType::BINARY => CDataType::Binary,
        CType::BIT => CDataType::Bit,
        CType::WCHAR => CDataType::WChar,
        CType::GUID => CDataType::Guid,
        CType::SBIGINT => CDataType::SBigInt,
        CType::UBIGINT => CDataType::UBigInt,
        _ => return None,
    };
    Some(mapped)
}

/// An executed statement handle owned elsewhere.
///
/// The handle is neither allocated nor freed here.
#[derive(Debug)]
pub struct OdbcStatement {
    handle: HStmt,
    pending: Vec<DiagnosticRecord>,
}

impl OdbcStatement {
    /// Wraps a statement handle.
    ///
    /// # Safety
    ///
    /// `handle` must be a valid statement handle with an open cursor, and
    /// must outlive the returned value.
    pub unsafe fn from_raw(handle: HStmt) -> Self {
        Self {
            handle,
            pending: Vec::new(),
        }
    }

    /// Returns the raw handle.
    pub fn as_raw(&self) -> HStmt {
        self.handle
    }

    fn unsupported(&mut self, c_type: CType) -> SqlReturn {
        self.pending = vec![DiagnosticRecord::new(
            "HY003",
            0,
            format!("C type {c_type} has no driver equivalent"),
        )];
        SqlReturn::Error
    }

    fn enter(&mut self) {
        self.pending.clear();
    }
}

impl NativeStatement for OdbcStatement {
    fn num_result_cols(&mut self, count: &mut u16) -> SqlReturn {
        self.enter();
        let mut out: i16 = 0;
        // SAFETY: handle validity is guaranteed by from_raw's contract
        let ret = convert(unsafe { SQLNumResultCols(self.handle, &mut out) });
        *count = u16::try_from(out).unwrap_or(0);
        ret
    }

    fn describe_col(
        &mut self,
        column_number: u16,
        description: &mut ColumnDescription,
    ) -> SqlReturn {
        self.enter();
        let mut name = vec![0u8; MAX_COLUMN_NAME_LEN];
        let mut name_length: i16 = 0;
        let mut data_type = SysSqlDataType::UNKNOWN_TYPE;
        let mut column_size = 0;
        let mut decimal_digits = 0;
        let mut nullable = SysNullability::UNKNOWN;

        // SAFETY: every out pointer refers to a live local of the right type
        let ret = convert(unsafe {
            SQLDescribeCol(
                self.handle,
                column_number,
                name.as_mut_ptr(),
                i16::try_from(name.len()).unwrap_or(i16::MAX),
                &mut name_length,
                &mut data_type,
                &mut column_size,
                &mut decimal_digits,
                &mut nullable,
            )
        });
        if !ret.is_success() {
            return ret;
        }

        name.truncate(usize::try_from(name_length).unwrap_or(0).min(MAX_COLUMN_NAME_LEN - 1));
        description.name = String::from_utf8_lossy(&name).into_owned();
        description.data_type = SqlDataType(data_type.0);
        description.column_size = column_size;
        description.decimal_digits = decimal_digits;
        description.nullable = match nullable.0 {
            0 => Nullability::NoNulls,
            1 => Nullability::Nullable,
            _ => Nullability::Unknown,
        };
        ret
    }

    unsafe fn bind_col(
        &mut self,
        column_number: u16,
        c_type: CType,
        buffer: &mut ColumnBuffer,
    ) -> SqlReturn {
        self.enter();
        let Some(target) = c_data_type(c_type) else {
            return self.unsupported(c_type);
        };
        convert(SQLBindCol(
            self.handle,
            column_number,
            target,
            buffer.as_mut_ptr() as Pointer,
            buffer.native_len() as Len,
            buffer.indicator_ptr(),
        ))
    }

    fn fetch(&mut self) -> SqlReturn {
        self.enter();
        // SAFETY: bound buffers are kept alive by the bind_col contract
        convert(unsafe { SQLFetch(self.handle) })
    }

    fn get_data(
        &mut self,
        column_number: u16,
        c_type: CType,
        buffer: &mut ColumnBuffer,
    ) -> SqlReturn {
        self.enter();
        let Some(target) = c_data_type(c_type) else {
            return self.unsupported(c_type);
        };
        // SAFETY: buffer and indicator are valid for the duration of the call
        convert(unsafe {
            SQLGetData(
                self.handle,
                column_number,
                target,
                buffer.as_mut_ptr() as Pointer,
                buffer.native_len() as Len,
                buffer.indicator_ptr(),
            )
        })
    }

    fn unbind_cols(&mut self) -> SqlReturn {
        self.enter();
        // SAFETY: handle validity is guaranteed by from_raw's contract
        convert(unsafe { SQLFreeStmt(self.handle, FreeStmtOption::Unbind) })
    }

    fn close_cursor(&mut self) -> SqlReturn {
        self.enter();
        // SAFETY: handle validity is guaranteed by from_raw's contract
        convert(unsafe { SQLFreeStmt(self.handle, FreeStmtOption::Close) })
    }

    fn diagnostics(&mut self) -> Vec<DiagnosticRecord> {
        if !self.pending.is_empty() {
            return std::mem::take(&mut self.pending);
        }

        let mut records = Vec::new();
        for record_number in 1..=MAX_DIAGNOSTIC_RECORDS {
            let mut state = [0u8; SQLSTATE_LEN + 1];
            let mut native_error = 0i32;
            let mut message = vec![0u8; MAX_DIAGNOSTIC_MESSAGE_LEN];
            let mut message_length: i16 = 0;

            // SAFETY: buffers are sized as declared to the driver
            let ret = convert(unsafe {
                SQLGetDiagRec(
                    HandleType::Stmt,
                    self.handle as Handle,
                    record_number,
                    state.as_mut_ptr(),
                    &mut native_error,
                    message.as_mut_ptr(),
                    i16::try_from(message.len()).unwrap_or(i16::MAX),
                    &mut message_length,
                )
            });
            if !ret.is_success() {
                break;
            }

            let length = usize::try_from(message_length)
                .unwrap_or(0)
                .min(message.len().saturating_sub(1));
            message.truncate(length);
            records.push(DiagnosticRecord::new(
                String::from_utf8_lossy(&state[..SQLSTATE_LEN]).into_owned(),
                native_error,
                String::from_utf8_lossy(&message).into_owned(),
            ));
        }
        records
    }
}
