//! In-memory statement for testing.
//!
//! `ScriptedStatement` serves a fixed result set with the observable
//! behavior of an ODBC driver: bound buffers are filled on fetch, explicit
//! reads are chunked with NUL terminators and `01004` truncation warnings,
//! and out-of-sequence calls fail with the SQLSTATEs a driver would use.
//! Failures can be injected per call, and every call is appended to a shared
//! [`CallLog`].
//!
//! Cells hold the C representation of the type the column will be read as.
//! The engine does not convert between types.

use std::sync::Arc;

use parking_lot::Mutex;
use rowlink_common::constants::{SQLSTATE_STRING_TRUNCATED, SQL_NO_TOTAL, SQL_NULL_DATA};
use rowlink_common::error::DiagnosticRecord;
use rowlink_common::memory::ColumnBuffer;
use uuid::Uuid;

use super::{ColumnDescription, NativeStatement, SqlReturn};
use crate::catalog::CType;

/// SQLSTATE for an invalid cursor state.
const SQLSTATE_INVALID_CURSOR: &str = "24000";
/// SQLSTATE for an invalid descriptor index.
const SQLSTATE_INVALID_INDEX: &str = "07009";

/// A native call, as recorded in the call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeCall {
    /// `SQLNumResultCols`
    NumResultCols,
    /// `SQLDescribeCol` for a one-based column.
    DescribeCol(u16),
    /// `SQLBindCol` for a one-based column.
    BindCol(u16),
    /// `SQLFetch`
    Fetch,
    /// `SQLGetData` for a one-based column.
    GetData(u16),
    /// `SQLFreeStmt(SQL_UNBIND)`
    UnbindCols,
    /// `SQLFreeStmt(SQL_CLOSE)`
    CloseCursor,
}

/// Shared record of native calls.
///
/// Clones observe the same log, so a test can keep one while a cursor
/// borrows the statement.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<NativeCall>>>,
}

impl CallLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: NativeCall) {
        self.calls.lock().push(call);
    }

    /// Returns a copy of all recorded calls.
    pub fn snapshot(&self) -> Vec<NativeCall> {
        self.calls.lock().clone()
    }

    /// Returns the number of recorded calls equal to `call`.
    pub fn count(&self, call: NativeCall) -> usize {
        self.calls.lock().iter().filter(|&&c| c == call).count()
    }

    /// Returns the recorded `SQLGetData` column numbers in call order.
    pub fn get_data_columns(&self) -> Vec<u16> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                NativeCall::GetData(column) => Some(*column),
                _ => None,
            })
            .collect()
    }

    /// Returns the number of recorded calls.
    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }

    /// Forgets all recorded calls.
    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

/// One cell of a scripted row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cell {
    data: Option<Vec<u8>>,
}

impl Cell {
    /// A NULL cell.
    pub fn null() -> Self {
        Self { data: None }
    }

    /// Raw C representation.
    pub fn raw(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: Some(data.into()),
        }
    }

    /// `SQL_C_LONG`
    pub fn long(v: i32) -> Self {
        Self::raw(v.to_ne_bytes())
    }

    /// `SQL_C_SHORT`
    pub fn short(v: i16) -> Self {
        Self::raw(v.to_ne_bytes())
    }

    /// `SQL_C_SBIGINT`
    pub fn bigint(v: i64) -> Self {
        Self::raw(v.to_ne_bytes())
    }

    /// `SQL_C_UBIGINT`
    pub fn ubigint(v: u64) -> Self {
        Self::raw(v.to_ne_bytes())
    }

    /// `SQL_C_FLOAT`
    pub fn float(v: f32) -> Self {
        Self::raw(v.to_ne_bytes())
    }

    /// `SQL_C_DOUBLE`
    pub fn double(v: f64) -> Self {
        Self::raw(v.to_ne_bytes())
    }

    /// `SQL_C_BIT`
    pub fn bit(v: bool) -> Self {
        Self::raw([u8::from(v)])
    }

    /// `SQL_C_CHAR`, without terminator.
    pub fn text(v: &str) -> Self {
        Self::raw(v.as_bytes())
    }

    /// `SQL_C_WCHAR`: UTF-16 code units, native endian, without terminator.
    pub fn wide(v: &str) -> Self {
        Self::raw(v.encode_utf16().flat_map(u16::to_ne_bytes).collect::<Vec<u8>>())
    }

    /// `SQL_C_BINARY`
    pub fn binary(v: &[u8]) -> Self {
        Self::raw(v)
    }

    /// `SQL_C_DATE`
    pub fn date(year: i16, month: u16, day: u16) -> Self {
        let mut out = Vec::with_capacity(6);
        out.extend_from_slice(&year.to_ne_bytes());
        out.extend_from_slice(&month.to_ne_bytes());
        out.extend_from_slice(&day.to_ne_bytes());
        Self::raw(out)
    }

    /// `SQL_C_TIME`
    pub fn time(hour: u16, minute: u16, second: u16) -> Self {
        let mut out = Vec::with_capacity(6);
        for field in [hour, minute, second] {
            out.extend_from_slice(&field.to_ne_bytes());
        }
        Self::raw(out)
    }

    /// `SQL_C_TYPE_TIMESTAMP`; `fraction` is in nanoseconds.
    pub fn timestamp(date: (i16, u16, u16), time: (u16, u16, u16), fraction: u32) -> Self {
        let mut out = Vec::with_capacity(16);
        out.extend_from_slice(&date.0.to_ne_bytes());
        for field in [date.1, date.2, time.0, time.1, time.2] {
            out.extend_from_slice(&field.to_ne_bytes());
        }
        out.extend_from_slice(&fraction.to_ne_bytes());
        Self::raw(out)
    }

    /// `SQL_C_GUID`
    pub fn guid(v: Uuid) -> Self {
        let (d1, d2, d3, d4) = v.as_fields();
        let mut out = Vec::with_capacity(16);
        out.extend_from_slice(&d1.to_ne_bytes());
        out.extend_from_slice(&d2.to_ne_bytes());
        out.extend_from_slice(&d3.to_ne_bytes());
        out.extend_from_slice(d4);
        Self::raw(out)
    }

    /// `SQL_C_NUMERIC` with a little-endian mantissa.
    pub fn numeric(precision: u8, scale: i8, positive: bool, mantissa: u128) -> Self {
        let mut out = Vec::with_capacity(19);
        out.push(precision);
        out.extend_from_slice(&scale.to_ne_bytes());
        out.push(u8::from(positive));
        out.extend_from_slice(&mantissa.to_le_bytes());
        Self::raw(out)
    }

    /// Returns true for a NULL cell.
    pub fn is_null(&self) -> bool {
        self.data.is_none()
    }

    /// Returns the C representation, `None` for NULL.
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }
}

/// A registered column binding.
#[derive(Debug, Clone, Copy)]
struct Binding {
    c_type: CType,
    data: *mut u8,
    capacity: usize,
    indicator: *mut isize,
}

/// Per-column progress of explicit reads on the current row.
#[derive(Debug, Clone, Copy, Default)]
struct ReadProgress {
    offset: usize,
    done: bool,
}

/// An injected call outcome.
#[derive(Debug, Clone)]
struct Injection {
    call: NativeCall,
    skip: usize,
    // None runs the call normally with `record` ahead of its own records
    ret: Option<SqlReturn>,
    record: DiagnosticRecord,
}

/// In-memory statement with a scripted result set.
///
/// # Example
///
/// ```rust
/// use rowlink_core::native::{Cell, ColumnDescription, NativeStatement, SqlDataType, SqlReturn};
/// use rowlink_core::native::ScriptedStatement;
///
/// let mut stmt = ScriptedStatement::new(vec![ColumnDescription::new("id", SqlDataType::INTEGER, 10)])
///     .with_row(vec![Cell::long(7)]);
///
/// assert_eq!(stmt.fetch(), SqlReturn::Success);
/// assert_eq!(stmt.fetch(), SqlReturn::NoData);
/// ```
#[derive(Debug)]
pub struct ScriptedStatement {
    columns: Vec<ColumnDescription>,
    rows: Arc<Vec<Vec<Cell>>>,
    next_row: usize,
    current: Option<usize>,
    open: bool,
    bindings: Vec<Option<Binding>>,
    progress: Vec<ReadProgress>,
    last_read: Option<u16>,
    no_total: bool,
    injections: Vec<Injection>,
    diagnostics: Vec<DiagnosticRecord>,
    log: CallLog,
}

impl ScriptedStatement {
    /// Creates a statement with the given columns and no rows.
    pub fn new(columns: Vec<ColumnDescription>) -> Self {
        let width = columns.len();
        Self {
            columns,
            rows: Arc::new(Vec::new()),
            next_row: 0,
            current: None,
            open: true,
            bindings: vec![None; width],
            progress: vec![ReadProgress::default(); width],
            last_read: None,
            no_total: false,
            injections: Vec::new(),
            diagnostics: Vec::new(),
            log: CallLog::new(),
        }
    }

    /// Appends a row.
    ///
    /// # Panics
    ///
    /// Panics if the row width differs from the column count.
    #[must_use]
    pub fn with_row(mut self, row: Vec<Cell>) -> Self {
        assert_eq!(
            row.len(),
            self.columns.len(),
            "scripted row width must match column count"
        );
        Arc::make_mut(&mut self.rows).push(row);
        self
    }

    /// Appends several rows.
    ///
    /// # Panics
    ///
    /// Panics if any row width differs from the column count.
    #[must_use]
    pub fn with_rows(self, rows: impl IntoIterator<Item = Vec<Cell>>) -> Self {
        rows.into_iter().fold(self, Self::with_row)
    }

    /// Reports `SQL_NO_TOTAL` instead of the remaining length on truncation.
    #[must_use]
    pub fn with_no_total(mut self, enabled: bool) -> Self {
        self.no_total = enabled;
        self
    }

    /// Records calls into an existing log.
    #[must_use]
    pub fn with_call_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    /// Fails the next matching call with `SQL_ERROR`.
    #[must_use]
    pub fn fail_on(self, call: NativeCall, record: DiagnosticRecord) -> Self {
        self.inject(call, 0, SqlReturn::Error, record)
    }

    /// Fails the matching call after letting `skip` matching calls through.
    #[must_use]
    pub fn fail_after(self, call: NativeCall, skip: usize, record: DiagnosticRecord) -> Self {
        self.inject(call, skip, SqlReturn::Error, record)
    }

    /// Answers the matching call with `ret` and `record`, without side
    /// effects, after letting `skip` matching calls through.
    #[must_use]
    pub fn inject(
        mut self,
        call: NativeCall,
        skip: usize,
        ret: SqlReturn,
        record: DiagnosticRecord,
    ) -> Self {
        self.injections.push(Injection {
            call,
            skip,
            ret: Some(ret),
            record,
        });
        self
    }

    /// Lets the matching call run normally but reports `record` ahead of
    /// any diagnostics the call produces itself.
    #[must_use]
    pub fn with_leading_record(mut self, call: NativeCall, record: DiagnosticRecord) -> Self {
        self.injections.push(Injection {
            call,
            skip: 0,
            ret: None,
            record,
        });
        self
    }

    /// Returns a handle on the call log.
    pub fn call_log(&self) -> CallLog {
        self.log.clone()
    }

    /// Returns the number of scripted rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the cursor is open.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Returns true if column `column_number` is bound.
    pub fn is_bound(&self, column_number: u16) -> bool {
        self.binding_slot(column_number)
            .and_then(|i| self.bindings[i])
            .is_some()
    }

    /// Reopens the cursor at the first row, as a re-execution would.
    ///
    /// Bindings are kept.
    pub fn rewind(&mut self) {
        self.open = true;
        self.next_row = 0;
        self.current = None;
        self.reset_progress();
    }

    /// Logs the call, clears diagnostics, and applies any injection.
    fn enter(&mut self, call: NativeCall) -> Option<SqlReturn> {
        self.log.record(call);
        self.diagnostics.clear();

        let position = self.injections.iter().position(|i| i.call == call)?;
        if self.injections[position].skip > 0 {
            self.injections[position].skip -= 1;
            return None;
        }
        let injection = self.injections.remove(position);
        self.diagnostics.push(injection.record);
        injection.ret
    }

    fn error(&mut self, state: &str, message: &str) -> SqlReturn {
        self.diagnostics.push(DiagnosticRecord::new(state, 0, message));
        SqlReturn::Error
    }

    fn truncated(&mut self) {
        self.diagnostics.push(DiagnosticRecord::new(
            SQLSTATE_STRING_TRUNCATED,
            0,
            "String data, right truncated",
        ));
    }

    fn binding_slot(&self, column_number: u16) -> Option<usize> {
        let index = usize::from(column_number).checked_sub(1)?;
        (index < self.columns.len()).then_some(index)
    }

    fn reset_progress(&mut self) {
        self.progress.fill(ReadProgress::default());
        self.last_read = None;
    }

    /// Writes `data` into a bound region. Returns true if it was truncated.
    ///
    /// # Safety
    ///
    /// The binding must point to live memory of at least `capacity` bytes.
    unsafe fn deposit(binding: &Binding, data: Option<&[u8]>) -> bool {
        let Some(data) = data else {
            *binding.indicator = SQL_NULL_DATA;
            return false;
        };

        let length = isize::try_from(data.len()).unwrap_or(isize::MAX);
        *binding.indicator = length;

        if binding.c_type.fixed_width().is_some() {
            let n = data.len().min(binding.capacity);
            std::ptr::copy_nonoverlapping(data.as_ptr(), binding.data, n);
            return false;
        }

        let usable = usable_len(binding.c_type, binding.capacity);
        let n = data.len().min(usable);
        std::ptr::copy_nonoverlapping(data.as_ptr(), binding.data, n);
        let terminator = binding.c_type.terminator_len();
        if n + terminator <= binding.capacity {
            std::ptr::write_bytes(binding.data.add(n), 0, terminator);
        }
        data.len() > usable
    }
}

/// Bytes of a variable-width value that fit in `capacity`.
fn usable_len(c_type: CType, capacity: usize) -> usize {
    let usable = capacity.saturating_sub(c_type.terminator_len());
    if c_type.is_wide() {
        usable & !1
    } else {
        usable
    }
}

impl NativeStatement for ScriptedStatement {
    fn num_result_cols(&mut self, count: &mut u16) -> SqlReturn {
        if let Some(ret) = self.enter(NativeCall::NumResultCols) {
            return ret;
        }
        *count = u16::try_from(self.columns.len()).unwrap_or(u16::MAX);
        SqlReturn::Success
    }

    fn describe_col(
        &mut self,
        column_number: u16,
        description: &mut ColumnDescription,
    ) -> SqlReturn {
        if let Some(ret) = self.enter(NativeCall::DescribeCol(column_number)) {
            return ret;
        }
        match self.binding_slot(column_number) {
            Some(index) => {
                description.clone_from(&self.columns[index]);
                SqlReturn::Success
            }
            None => self.error(SQLSTATE_INVALID_INDEX, "Invalid descriptor index"),
        }
    }

    unsafe fn bind_col(
        &mut self,
        column_number: u16,
        c_type: CType,
        buffer: &mut ColumnBuffer,
    ) -> SqlReturn {
        if let Some(ret) = self.enter(NativeCall::BindCol(column_number)) {
            return ret;
        }
        let Some(index) = self.binding_slot(column_number) else {
            return self.error(SQLSTATE_INVALID_INDEX, "Invalid descriptor index");
        };
        self.bindings[index] = Some(Binding {
            c_type,
            data: buffer.as_mut_ptr(),
            capacity: buffer.capacity(),
            indicator: buffer.indicator_ptr(),
        });
        SqlReturn::Success
    }

    fn fetch(&mut self) -> SqlReturn {
        if let Some(ret) = self.enter(NativeCall::Fetch) {
            return ret;
        }
        if !self.open {
            return self.error(SQLSTATE_INVALID_CURSOR, "Invalid cursor state");
        }

        self.reset_progress();
        if self.next_row >= self.rows.len() {
            self.current = None;
            return SqlReturn::NoData;
        }

        let row_index = self.next_row;
        self.next_row += 1;
        self.current = Some(row_index);

        let rows = Arc::clone(&self.rows);
        let mut truncated = false;
        for (binding, cell) in self.bindings.iter().zip(&rows[row_index]) {
            if let Some(binding) = binding {
                // SAFETY: bind_col's contract keeps the region alive until
                // unbind or close
                truncated |= unsafe { Self::deposit(binding, cell.data()) };
            }
        }

        if truncated {
            self.truncated();
            SqlReturn::SuccessWithInfo
        } else {
            SqlReturn::Success
        }
    }

    fn get_data(
        &mut self,
        column_number: u16,
        c_type: CType,
        buffer: &mut ColumnBuffer,
    ) -> SqlReturn {
        if let Some(ret) = self.enter(NativeCall::GetData(column_number)) {
            return ret;
        }
        let Some(row_index) = self.current.filter(|_| self.open) else {
            return self.error(SQLSTATE_INVALID_CURSOR, "Invalid cursor state");
        };
        let Some(index) = self.binding_slot(column_number) else {
            return self.error(SQLSTATE_INVALID_INDEX, "Invalid descriptor index");
        };
        if self.bindings[index].is_some() {
            return self.error(SQLSTATE_INVALID_INDEX, "Column is bound");
        }
        if self.last_read.is_some_and(|last| column_number < last) {
            return self.error(SQLSTATE_INVALID_INDEX, "Columns must be read in ascending order");
        }
        self.last_read = Some(column_number);

        let progress = self.progress[index];
        if progress.done {
            return SqlReturn::NoData;
        }

        let Some(data) = self.rows[row_index][index].data.clone() else {
            buffer.set_indicator(SQL_NULL_DATA);
            self.progress[index].done = true;
            return SqlReturn::Success;
        };

        let remaining = &data[progress.offset..];
        let remaining_len = isize::try_from(remaining.len()).unwrap_or(isize::MAX);

        if c_type.fixed_width().is_some() {
            let n = remaining.len().min(buffer.capacity());
            buffer.as_mut_slice()[..n].copy_from_slice(&remaining[..n]);
            buffer.set_indicator(remaining_len);
            self.progress[index].done = true;
            return SqlReturn::Success;
        }

        let usable = usable_len(c_type, buffer.capacity());
        let n = remaining.len().min(usable);
        let terminator = c_type.terminator_len();
        let out = buffer.as_mut_slice();
        out[..n].copy_from_slice(&remaining[..n]);
        if n + terminator <= out.len() {
            out[n..n + terminator].fill(0);
        }

        if remaining.len() <= usable {
            buffer.set_indicator(remaining_len);
            self.progress[index].done = true;
            SqlReturn::Success
        } else {
            buffer.set_indicator(if self.no_total {
                SQL_NO_TOTAL
            } else {
                remaining_len
            });
            self.progress[index].offset += n;
            self.truncated();
            SqlReturn::SuccessWithInfo
        }
    }

    fn unbind_cols(&mut self) -> SqlReturn {
        if let Some(ret) = self.enter(NativeCall::UnbindCols) {
            return ret;
        }
        self.bindings.fill(None);
        SqlReturn::Success
    }

    fn close_cursor(&mut self) -> SqlReturn {
        if let Some(ret) = self.enter(NativeCall::CloseCursor) {
            return ret;
        }
        self.open = false;
        self.current = None;
        self.reset_progress();
        SqlReturn::Success
    }

    fn diagnostics(&mut self) -> Vec<DiagnosticRecord> {
        self.diagnostics.clone()
    }
}
